//! Line-oriented output writers.
//!
//! The simulation record is the annealing-era log format: a temperature
//! header, the parameter vector wrapped five values per line, and the
//! simulation matrix wrapped ten values per line with a `# <row>` marker per
//! row, terminated by a dash separator. The CSV writers emit one header row
//! of names followed by one row per sample.

use std::io::{self, Write};

use ndarray::ArrayView2;

/// Writes one simulation record.
pub fn write_record<W: Write>(
    writer: &mut W,
    temperature: f64,
    params: &[f64],
    simdata: ArrayView2<'_, f64>,
) -> io::Result<()> {
    writeln!(writer, "# TEMPERATURE")?;
    writeln!(writer, "{temperature}")?;

    writeln!(writer, "# PARAMETERS ({})", params.len())?;
    write_wrapped(writer, params.iter().copied(), 5)?;

    writeln!(writer, "# SIMDATA ({},{})", simdata.nrows(), simdata.ncols())?;
    for (i, row) in simdata.rows().into_iter().enumerate() {
        writeln!(writer, "# {i}")?;
        write_wrapped(writer, row.iter().copied(), 10)?;
    }

    writeln!(writer, "#{}", "-".repeat(97))?;
    Ok(())
}

/// Comma-separates values, breaking the line at every `wrap`-th value and
/// after the last one.
fn write_wrapped<W: Write>(
    writer: &mut W,
    values: impl ExactSizeIterator<Item = f64>,
    wrap: usize,
) -> io::Result<()> {
    let last = values.len().saturating_sub(1);
    for (i, value) in values.enumerate() {
        write!(writer, "{value}")?;
        if (i != 0 && i % wrap == 0) || i == last {
            writeln!(writer)?;
        } else {
            write!(writer, ", ")?;
        }
    }
    Ok(())
}

/// Writes a header row of names followed by one CSV row per matrix row.
pub fn write_csv<W: Write>(
    writer: &mut W,
    names: &[&str],
    rows: ArrayView2<'_, f64>,
) -> io::Result<()> {
    writeln!(writer, "{}", names.join(","))?;
    for row in rows.rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    Ok(())
}
