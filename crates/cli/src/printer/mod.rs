use std::io::{self, Write};

use viewtrack_protocol::RetrieveResponse;

/// Renders the counts returned for one identifier.
pub trait CountPrinter {
    fn print(&mut self, resp: &RetrieveResponse) -> io::Result<()>;
}

/// Aligned two-column table.
pub struct HumanPrinter<W: Write> {
    out: W,
}

impl<W: Write> HumanPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> CountPrinter for HumanPrinter<W> {
    fn print(&mut self, resp: &RetrieveResponse) -> io::Result<()> {
        let width = resp
            .counts
            .iter()
            .map(|c| c.description.len())
            .max()
            .unwrap_or(0);

        writeln!(self.out, "{}", resp.id)?;
        for count in &resp.counts {
            writeln!(
                self.out,
                "  {:<width$}  {:>8}",
                count.description, count.count
            )?;
        }
        Ok(())
    }
}

/// One JSON object per response, for machine consumption.
pub struct JsonPrinter<W: Write> {
    out: W,
}

impl<W: Write> JsonPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> CountPrinter for JsonPrinter<W> {
    fn print(&mut self, resp: &RetrieveResponse) -> io::Result<()> {
        let obj = serde_json::json!({
            "id": resp.id,
            "counts": resp.counts,
        });
        writeln!(self.out, "{}", obj)
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
