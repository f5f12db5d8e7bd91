/*
 *  plugin/builtin/word_clock.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fuzzy time spelled out in words
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::{anyhow, Context};
use chrono::{Local, Timelike};
use rand::seq::IndexedRandom;

use super::text_data;
use crate::display::{Field, FieldArea, PageLayout};
use crate::plugin::registry::{Helper, PluginSpec};
use crate::plugin::{FetchError, FetchOutcome, Fetcher, PluginContext, PluginError};

pub const NAME: &str = "word_clock";

const HOURS: [&[&str]; 12] = [
    &["twelve", "midnight"],
    &["one"],
    &["two"],
    &["three"],
    &["four"],
    &["five"],
    &["six"],
    &["seven"],
    &["eight"],
    &["nine"],
    &["ten"],
    &["eleven"],
];

const MINUTES: [&[&str]; 7] = [
    &["o'clock"],
    &["ten past", "ten after"],
    &["twenty past", "twenty after"],
    &["half past", "thirty past"],
    &["twenty til", "twenty to"],
    &["ten til", "ten to"],
    &["o'clock"],
];

const STEMS: &[&str] = &[
    "It's about",
    "It's around",
    "The time is about",
    "It's nearly",
    "It's just about",
    "It's close to",
];

const SAMPLE: &str = "\
- name: Word Clock
  plugin: word_clock
  layout: layout
  refresh_rate: 125
  min_display_time: 255
  max_priority: 2
  text_color: random
  bkground_color: random
";

/// Linear map of `s` from range `a` onto range `b`, rounded
fn map_val(a: (i32, i32), b: (i32, i32), s: i32) -> i32 {
    let t = b.0 as f64 + ((s - a.0) as f64 * (b.1 - b.0) as f64) / (a.1 - a.0) as f64;
    t.round() as i32
}

fn title_case(phrase: &str) -> String {
    phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spell out `hour:minute`, `pick` chooses among synonyms
///
/// Past the 34 minute mark the phrase counts toward the next hour.
pub fn time_words(hour: u32, minute: u32, mut pick: impl FnMut(&[&'static str]) -> &'static str) -> String {
    let bucket = map_val((1, 59), (0, 6), minute as i32).clamp(0, 6) as usize;
    let hour = if minute <= 34 { hour } else { hour + 1 };
    let hour_word = title_case(pick(HOURS[(hour % 12) as usize]));
    let minute_word = title_case(pick(MINUTES[bucket]));

    let time = if bucket == 0 || bucket == 6 {
        format!("{} {}", hour_word, minute_word)
    } else {
        format!("{} {}", minute_word, hour_word)
    };
    format!("{} {}", pick(STEMS), time)
}

fn random_pick(options: &[&'static str]) -> &'static str {
    options.choose(&mut rand::rng()).copied().unwrap_or_default()
}

fn parse_hhmm(text: &str) -> anyhow::Result<(u32, u32)> {
    let (h, m) = text
        .split_once(':')
        .ok_or_else(|| anyhow!("time must look like HH:MM, got '{}'", text))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad hour in '{}'", text))?;
    let m: u32 = m.trim().parse().with_context(|| format!("bad minute in '{}'", text))?;
    if h > 23 || m > 59 {
        return Err(anyhow!("'{}' is not a time of day", text));
    }
    Ok((h, m))
}

struct WordClock;

impl Fetcher for WordClock {
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        let now = Local::now();
        let data = text_data([
            ("wordtime", time_words(now.hour(), now.minute(), random_pick)),
            ("time", now.format("%H:%M").to_string()),
        ]);
        Ok(FetchOutcome::new(true, data, ctx.max_priority))
    }
}

fn build(_ctx: &PluginContext) -> Result<Box<dyn Fetcher>, PluginError> {
    Ok(Box::new(WordClock))
}

fn layout(name: &str) -> Option<PageLayout> {
    match name {
        "layout" => Some(
            PageLayout::new("layout").add_field(Field::new_text("wordtime", FieldArea::new(0.05, 0.05, 0.9, 0.9)).max_lines(3)),
        ),
        _ => None,
    }
}

fn helper_time_words(args: &[String]) -> anyhow::Result<String> {
    let (h, m) = match args.first() {
        Some(arg) => parse_hhmm(arg)?,
        None => {
            let now = Local::now();
            (now.hour(), now.minute())
        }
    };
    Ok(time_words(h, m, random_pick))
}

pub fn spec() -> PluginSpec {
    PluginSpec {
        name: NAME,
        description: "Approximate time as a phrase, such as 'It's about twenty past ten'",
        data_keys: &[("wordtime", "time as words"), ("time", "HH:MM the phrase was made from")],
        layouts: &["layout"],
        default_max_priority: 2,
        sample_config: SAMPLE,
        build,
        layout,
        helpers: &[Helper {
            name: "time_words",
            description: "print the phrase for HH:MM (or now)",
            run: helper_time_words,
        }],
    }
}
