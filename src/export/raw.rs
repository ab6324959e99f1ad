//! src/export/raw.rs
//!
//! Plainest possible dump: every SQL statement on its own line with its
//! parameter values rendered as literals. Mostly useful for debugging and
//! for the `check` command's end-to-end pass.

use std::io::{Read, Write};

use crate::proto::SqlStatement;
use crate::reader::walk::{Consumer, ConsumerResult};

pub struct RawDumper<W: Write> {
    out: W,
}

impl<W: Write> RawDumper<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<R: Read, W: Write> Consumer<R> for RawDumper<W> {
    fn on_statement(&mut self, statement: &SqlStatement) -> ConsumerResult {
        write!(self.out, "{}", statement.sql())?;
        if !statement.parameters.is_empty() {
            write!(self.out, " -- ")?;
            for (i, p) in statement.parameters.iter().enumerate() {
                if i > 0 {
                    write!(self.out, ", ")?;
                }
                write!(self.out, "{}", p.value())?;
            }
        }
        writeln!(self.out)?;
        Ok(())
    }
}
