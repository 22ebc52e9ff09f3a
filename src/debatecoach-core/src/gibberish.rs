//! Heuristic check for degenerate, non-linguistic input.
//!
//! Only used to pick a better fallback argument. It never blocks a submission.

const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

const MIN_LENGTH: usize = 10;
const MAX_REPEAT: usize = 5;
const MIN_ALPHA_RATIO: f64 = 0.6;
const KEYBOARD_RUN: usize = 5;
const MIN_REAL_WORDS: usize = 3;

/// True when `text` looks like keyboard mashing rather than an argument.
pub fn is_gibberish(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_LENGTH {
        return true;
    }

    has_repeated_char(trimmed)
        || alphabetic_ratio(trimmed) < MIN_ALPHA_RATIO
        || has_keyboard_run(trimmed)
        || real_word_count(trimmed) < MIN_REAL_WORDS
}

fn has_repeated_char(text: &str) -> bool {
    let mut previous = None;
    let mut run = 0;
    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= MAX_REPEAT {
            return true;
        }
    }
    false
}

fn alphabetic_ratio(text: &str) -> f64 {
    let (alpha, total) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(alpha, total), c| {
            (alpha + usize::from(c.is_alphabetic()), total + 1)
        });
    if total == 0 {
        return 0.0;
    }
    alpha as f64 / total as f64
}

fn keyboard_row(c: char) -> Option<usize> {
    let c = c.to_ascii_lowercase();
    KEYBOARD_ROWS.iter().position(|row| row.contains(c))
}

/// A run of letters that all sit on the same keyboard row, in any order.
fn has_keyboard_run(text: &str) -> bool {
    let mut current = None;
    let mut run = 0;
    for c in text.chars() {
        let row = if c.is_ascii_alphabetic() { keyboard_row(c) } else { None };
        match row {
            Some(_) if row == current => run += 1,
            Some(_) => {
                current = row;
                run = 1;
            }
            None => {
                current = None;
                run = 0;
            }
        }
        if run >= KEYBOARD_RUN {
            return true;
        }
    }
    false
}

fn real_word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .count()
}
