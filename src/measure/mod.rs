//! The `measure` command: route lengths of a circuit as a report.
//!
//! Loads a YAML hierarchy dump, flattens the requested circuit, measures every
//! endpoint-to-endpoint route and prints them longest first. Routes can be
//! narrowed down to those touching endpoints that match a regular expression,
//! and also written as CSV for downstream tools.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pathlen::measure::{MeasureArgs, measure_main};
//!
//! let args = MeasureArgs {
//!     input: "mzi.yml".into(),
//!     top: None,
//!     report: Some("mzi.rpt".into()),
//!     csv: Some("mzi.csv".into()),
//!     filter: Some("^in".into()),
//! };
//!
//! measure_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{cmp, fs, io::BufWriter, io::Write, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use ordered_float::OrderedFloat;
use prettytable::*;
use regex::Regex;

use crate::diagnostics::LogSink;
use crate::netlist::yaml::NetlistDocument;
use crate::{RouteRecord, compute_path_lengths, read_netlist_file};

/// Command-line arguments for the measure command.
#[derive(Parser, Debug)]
pub struct MeasureArgs {
    /// YAML hierarchy dump
    pub input: PathBuf,

    /// Circuit to measure (default: the document's top circuit)
    #[clap(long, short)]
    pub top: Option<String>,

    /// Report file (default: stdout)
    #[clap(long, short)]
    pub report: Option<PathBuf>,

    /// CSV file listing every route as start,end,length
    #[clap(long)]
    pub csv: Option<PathBuf>,

    /// Only keep routes with an endpoint matching this regular expression
    #[clap(long, short)]
    pub filter: Option<String>,
}

/// Measure the routes of a circuit and report them.
pub fn measure_main(args: MeasureArgs) -> Result<()> {
    let MeasureArgs {
        input,
        top,
        report,
        csv,
        filter,
    } = args;

    let filter = filter
        .map(|pattern| Regex::new(&pattern).with_context(|| format!("invalid filter {}", pattern)))
        .transpose()?;

    let mut writer: Box<dyn Write> = match report {
        Some(path) => Box::new(
            fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let document = read_netlist_file(&input)?;
    let circuit = select_circuit(&document, top.as_deref())?;

    let mut records = compute_path_lengths(&document.circuits, circuit, &LogSink)?;
    if let Some(re) = &filter {
        records = filter_records(records, re);
    }
    sort_records(&mut records);

    if let Some(output) = csv {
        let mut csv_file = BufWriter::new(
            fs::File::create(&output).with_context(|| format!("creating {}", output.display()))?,
        );
        write_csv(&mut csv_file, &records)?;
    }

    writeln!(writer, "Circuit: {}", circuit)?;
    write_report(&mut writer, &records)?;

    Ok(())
}

/// The circuit requested on the command line, or the document's top.
pub fn select_circuit<'a>(document: &'a NetlistDocument, top: Option<&'a str>) -> Result<&'a str> {
    let circuit = top.unwrap_or(&document.top);
    if !document.circuits.contains(circuit) {
        return Err(anyhow!("circuit {} is not defined", circuit));
    }
    Ok(circuit)
}

/// Keep the records with at least one endpoint matching `re`.
pub fn filter_records(records: Vec<RouteRecord>, re: &Regex) -> Vec<RouteRecord> {
    records
        .into_iter()
        .filter(|r| re.is_match(&r.start.to_string()) || re.is_match(&r.end.to_string()))
        .collect()
}

/// Longest first; ties keep extraction order.
pub fn sort_records(records: &mut [RouteRecord]) {
    records.sort_by_key(|r| cmp::Reverse(OrderedFloat(r.length)));
}

pub fn write_report<W: Write + ?Sized>(writer: &mut W, records: &[RouteRecord]) -> Result<()> {
    let mut table = Table::new();
    table.set_titles(row!["Start", "End", "Length"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    for record in records {
        table.add_row(row![
            record.start,
            record.end,
            format!("{:.3}", record.length),
        ]);
    }

    writeln!(writer, "Paths: {}", records.len())?;
    if !records.is_empty() {
        table.print(writer)?;
    }

    Ok(())
}

/// Endpoints are quoted since port names contain the instance separator.
pub fn write_csv<W: Write + ?Sized>(writer: &mut W, records: &[RouteRecord]) -> Result<()> {
    writeln!(writer, "start,end,length")?;
    for record in records {
        writeln!(writer, "\"{}\",\"{}\",{}", record.start, record.end, record.length)?;
    }
    Ok(())
}
