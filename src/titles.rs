/*
 *  titles.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Track title cleanup, drops "(feat. ...)" style credits
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

/// Markers live in the control range `\0..=\x1f`, one per artist.
const MAX_MARKED_ARTISTS: usize = 0x1f;

#[inline]
fn is_marker(c: char) -> bool {
    (c as u32) <= 0x1f
}

/// Removes every parenthesized group of `track` that names one of `artists`.
///
/// `strip_artists("a (x b) c (d x) e (f)", &["a","b","c","d","e","f"])` gives `"a c e"`.
///
/// Artist names match as plain substrings, so short names can over-match, and
/// only the first 31 artists take part. Nested parentheses get no special
/// treatment. An artist name that survives inside a kept parenthesized group is
/// shown as its 1-based index, e.g. `[2]`.
pub fn strip_artists<S: AsRef<str>>(track: &str, artists: &[S]) -> String {
    // control chars are reserved for the markers
    let mut marked: String = track.chars().filter(|&c| !is_marker(c)).collect();

    for (i, artist) in artists.iter().take(MAX_MARKED_ARTISTS).enumerate() {
        let artist = artist.as_ref();
        if artist.is_empty() {
            continue;
        }
        if let Some(marker) = char::from_u32(i as u32) {
            marked = marked.replace(artist, marker.encode_utf8(&mut [0u8; 4]));
        }
    }

    let stripped = remove_marked_groups(&marked);
    restore_markers(&stripped, artists).trim().to_string()
}

/// Single left-to-right pass removing ` ?(` ... `)` spans that hold no inner
/// parenthesis and at least one marker.
fn remove_marked_groups(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let open = if chars[i] == ' ' && chars.get(i + 1) == Some(&'(') {
            i + 1
        } else if chars[i] == '(' {
            i
        } else {
            out.push(chars[i]);
            i += 1;
            continue;
        };

        let close = chars[open + 1..]
            .iter()
            .position(|&c| c == '(' || c == ')')
            .map(|p| open + 1 + p);

        match close {
            Some(end) if chars[end] == ')' && chars[open + 1..end].iter().any(|&c| is_marker(c)) => {
                i = end + 1;
            }
            _ => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }

    out
}

fn restore_markers<S: AsRef<str>>(text: &str, artists: &[S]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => { depth += 1; out.push(c); }
            ')' => { depth = depth.saturating_sub(1); out.push(c); }
            c if is_marker(c) => {
                let index = c as usize;
                match artists.get(index) {
                    Some(name) if depth == 0 => out.push_str(name.as_ref()),
                    _ => out.push_str(&format!("[{}]", index + 1)),
                }
            }
            c => out.push(c),
        }
    }

    out
}
