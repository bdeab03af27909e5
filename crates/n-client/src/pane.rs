// SPDX-License-Identifier: MIT
//
// Panes and the dispatch seam.
//
// A pane is one output context (a server window, a channel) that owns its
// scrollback. Framed lines reach a pane through a `Dispatch`
// implementation, which decides what a record means and what, if anything,
// to append. Protocol parsing lives behind that trait, not here.

use crate::compositor::{Viewport, VISIBLE_WINDOW};
use crate::framer::Line;
use crate::scrollback::{Retention, ScrollbackLog};

use n_term::wrap::WrappedLine;

/// One addressable output context.
#[derive(Debug)]
pub struct Pane {
    pub title: String,
    pub log: ScrollbackLog,
}

impl Pane {
    #[must_use]
    pub fn new(title: impl Into<String>, retention: Retention) -> Self {
        Self {
            title: title.into(),
            log: ScrollbackLog::with_retention(retention),
        }
    }

    /// The rows this pane shows in `viewport` right now.
    #[must_use]
    pub fn compose(&self, viewport: Viewport) -> Vec<WrappedLine> {
        viewport.compose(&self.log.visible(VISIBLE_WINDOW))
    }
}

/// Turns framed records into pane output.
pub trait Dispatch {
    fn dispatch(&mut self, line: &Line, pane: &mut Pane);
}

impl<F: FnMut(&Line, &mut Pane)> Dispatch for F {
    fn dispatch(&mut self, line: &Line, pane: &mut Pane) {
        self(line, pane);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn closures_dispatch() {
        let mut pane = Pane::new("server", Retention::Unbounded);
        let mut upper = |line: &Line, pane: &mut Pane| pane.log.append(line.to_text().to_uppercase());
        upper.dispatch(&Line::from("hi"), &mut pane);
        assert_eq!(pane.log.visible(5), vec!["HI"]);
    }

    #[test]
    fn compose_reads_through_the_cursor() {
        let mut pane = Pane::new("server", Retention::Unbounded);
        for text in ["a", "b", "c"] {
            pane.log.append(text);
        }
        pane.log.scroll_up();
        let viewport = Viewport { width: 10, height: 5 };
        let rows: Vec<String> = pane.compose(viewport).into_iter().map(WrappedLine::into_string).collect();
        assert_eq!(rows, vec!["a\x1b[0m", "b\x1b[0m"]);
    }
}
