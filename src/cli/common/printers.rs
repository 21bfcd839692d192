// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Pretty printers for reporting information.
use std::borrow::Cow;

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

/// Collects lines under a bold title and logs them as a tree.
pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Vec<Vec<Cow<'static, str>>>,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            blocks: vec![],
        }
    }

    pub(crate) fn push_line(&mut self, line: Cow<'static, str>) {
        self.blocks.push(vec![line]);
    }

    pub(crate) fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        self.blocks.push(block);
    }

    /// The tree symbol in front of each line, in order.
    fn symbols(&self) -> Vec<char> {
        let num_blocks = self.blocks.len();
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(i_block, block)| {
                let num_lines = block.len();
                (0..num_lines).map(move |i_line| {
                    match (i_line, i_line + 1 == num_lines, i_block + 1 == num_blocks) {
                        (0, false, _) => VERTICAL_AND_RIGHT,
                        (0, _, false) => VERTICAL_AND_RIGHT,
                        (0, true, true) => UP_AND_RIGHT,
                        _ => VERTICAL,
                    }
                })
            })
            .collect()
    }

    pub(crate) fn display(self) {
        let symbols = self.symbols();
        log::info!("{}", console::style(self.title).bold());
        for (symbol, line) in symbols.into_iter().zip(self.blocks.into_iter().flatten()) {
            log::info!("{symbol} {line}");
        }
        log::info!("");
    }
}
