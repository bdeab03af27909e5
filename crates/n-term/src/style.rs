// SPDX-License-Identifier: MIT
//
// Style: the SGR state carried across a wrap boundary.
//
// Chat messages arrive as strings with embedded SGR sequences (`ESC[1;32m`
// and friends). When a styled message is broken over several display rows,
// every row after the first has to re-establish whatever colors and
// attributes were active when the previous row ended. We could keep the raw
// sequences in a growing string, but a hostile or merely chatty sender can
// emit thousands of them. Instead we fold them into a fixed-size `Style`
// value: one foreground, one background, one attribute bitfield. Folding
// is idempotent and bounded; re-emitting it is a single CSI sequence.
//
// Parsing follows ECMA-48 / xterm: semicolon-separated parameters, with
// colon sub-parameters for the extended color forms (`38:2::r:g:b`).

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR parameters. Combine with bitwise OR:
    ///
    /// ```
    /// use n_term::style::Attr;
    ///
    /// let attrs = Attr::BOLD | Attr::UNDERLINE;
    /// assert!(attrs.contains(Attr::BOLD));
    /// assert!(!attrs.contains(Attr::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u16 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2: decreased intensity (faint).
        const DIM           = 1 << 1;
        /// SGR 3: italic or oblique.
        const ITALIC        = 1 << 2;
        /// SGR 4: underline.
        const UNDERLINE     = 1 << 3;
        /// SGR 5: slow blink.
        const SLOW_BLINK    = 1 << 4;
        /// SGR 6: rapid blink. Rarely supported.
        const RAPID_BLINK   = 1 << 5;
        /// SGR 7: swap foreground and background.
        const INVERSE       = 1 << 6;
        /// SGR 8: invisible text.
        const HIDDEN        = 1 << 7;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 8;
    }
}

/// A terminal color as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Color {
    /// Terminal default color (SGR 39 / 49).
    #[default]
    Default,
    /// ANSI 256-color palette index. 0–7 are the classic colors,
    /// 8–15 their bright variants.
    Ansi256(u8),
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

/// The complete SGR state at a point in a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
}

impl Style {
    /// A style that sets only the foreground.
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            fg: color,
            bg: Color::Default,
            attrs: Attr::empty(),
        }
    }

    /// Builder: add attributes.
    #[must_use]
    pub const fn with_attrs(mut self, attrs: Attr) -> Self {
        self.attrs = self.attrs.union(attrs);
        self
    }

    /// Whether this is the terminal's default rendition (nothing to emit).
    #[inline]
    #[must_use]
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Fold the parameter bytes of one SGR sequence into this style.
    ///
    /// `params` is everything between `ESC [` and the final `m`. An empty
    /// parameter list is SGR 0 (reset). Unknown parameters are ignored.
    pub fn apply_sgr(&mut self, params: &[u8]) {
        if params.is_empty() {
            *self = Self::default();
            return;
        }

        let groups = parse_groups(params);
        let mut i = 0;
        while i < groups.len() {
            let group = &groups[i];
            let code = group.first().copied().unwrap_or(0);
            i += 1;

            match code {
                0 => *self = Self::default(),
                1 => self.attrs.insert(Attr::BOLD),
                2 => self.attrs.insert(Attr::DIM),
                3 => self.attrs.insert(Attr::ITALIC),
                // `4:0` is the colon form of "underline off".
                4 if group.get(1) == Some(&0) => self.attrs.remove(Attr::UNDERLINE),
                4 | 21 => self.attrs.insert(Attr::UNDERLINE),
                5 => self.attrs.insert(Attr::SLOW_BLINK),
                6 => self.attrs.insert(Attr::RAPID_BLINK),
                7 => self.attrs.insert(Attr::INVERSE),
                8 => self.attrs.insert(Attr::HIDDEN),
                9 => self.attrs.insert(Attr::STRIKETHROUGH),
                22 => self.attrs.remove(Attr::BOLD | Attr::DIM),
                23 => self.attrs.remove(Attr::ITALIC),
                24 => self.attrs.remove(Attr::UNDERLINE),
                25 => self.attrs.remove(Attr::SLOW_BLINK | Attr::RAPID_BLINK),
                27 => self.attrs.remove(Attr::INVERSE),
                28 => self.attrs.remove(Attr::HIDDEN),
                29 => self.attrs.remove(Attr::STRIKETHROUGH),
                30..=37 => self.fg = Color::Ansi256(low_byte(code - 30)),
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Ansi256(low_byte(code - 40)),
                49 => self.bg = Color::Default,
                90..=97 => self.fg = Color::Ansi256(low_byte(code - 90 + 8)),
                100..=107 => self.bg = Color::Ansi256(low_byte(code - 100 + 8)),
                38 | 48 => {
                    let color = if group.len() > 1 {
                        extended_color(&group[1..])
                    } else {
                        let (color, used) = extended_color_from_groups(&groups[i..]);
                        i += used;
                        color
                    };
                    if let Some(color) = color {
                        if code == 38 {
                            self.fg = color;
                        } else {
                            self.bg = color;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Split `1;38:5:208;4` into `[[1], [38, 5, 208], [4]]`.
fn parse_groups(params: &[u8]) -> Vec<Vec<u16>> {
    params
        .split(|&b| b == b';')
        .map(|group| {
            group
                .split(|&b| b == b':')
                .map(|digits| {
                    digits.iter().filter(|b| b.is_ascii_digit()).fold(0u16, |acc, &b| {
                        acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                    })
                })
                .collect()
        })
        .collect()
}

/// Colon form: the sub-parameters after `38`/`48` in one group.
///
/// Accepts both `38:2:r:g:b` and the ITU form `38:2::r:g:b` (empty
/// color-space id).
fn extended_color(subs: &[u16]) -> Option<Color> {
    match subs {
        [5, idx, ..] => Some(Color::Ansi256(low_byte(*idx))),
        [2, _, r, g, b] | [2, r, g, b] => Some(Color::Rgb(low_byte(*r), low_byte(*g), low_byte(*b))),
        _ => None,
    }
}

/// Semicolon form: `38;5;n` or `38;2;r;g;b`. Returns the color and how many
/// following groups it consumed.
fn extended_color_from_groups(rest: &[Vec<u16>]) -> (Option<Color>, usize) {
    let value = |n: usize| rest.get(n).and_then(|g| g.first().copied());
    match value(0) {
        Some(5) => value(1).map_or((None, 1), |idx| (Some(Color::Ansi256(low_byte(idx))), 2)),
        Some(2) => match (value(1), value(2), value(3)) {
            (Some(r), Some(g), Some(b)) => {
                (Some(Color::Rgb(low_byte(r), low_byte(g), low_byte(b))), 4)
            }
            _ => (None, rest.len().min(4)),
        },
        Some(_) => (None, 1),
        None => (None, 0),
    }
}

#[allow(clippy::cast_possible_truncation)] // SGR color components are 0–255 by definition.
const fn low_byte(v: u16) -> u8 {
    if v > 255 { 255 } else { v as u8 }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
