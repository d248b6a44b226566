use std::io::{self, Write};

use serde::Serialize;

use crate::app::{PrepareResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_prepare(result: &PrepareResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_checklist(checklist: &[String]) -> io::Result<()> {
        Self::print_json(&checklist)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Prints progress lines on stderr so stdout stays machine-readable.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.2?})", event.message, elapsed),
            None => eprintln!("{}", event.message),
        }
    }
}

pub fn render_summary(result: &PrepareResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Study {}\n", result.study_id));
    out.push_str(&format!(
        "  specimens: {}  donors: {}  manifest entries: {}\n",
        result.specimens, result.donors, result.manifest_entries
    ));
    for partition in &result.partitions {
        out.push_str(&format!(
            "  {}: {} biosamples -> {}\n",
            partition.source, partition.biosamples, partition.file_name
        ));
    }
    if result.dry_run {
        out.push_str("  dry run: nothing written\n");
    } else {
        out.push_str(&format!("  written to {}:\n", result.working_dir));
        for name in &result.written {
            out.push_str(&format!("    {name}\n"));
        }
    }
    out.push_str(&render_checklist(&result.manual_checklist));
    out
}

pub fn render_checklist(checklist: &[String]) -> String {
    if checklist.is_empty() {
        return "No metadata files left to author by hand.\n".to_string();
    }
    let mut out = String::from("Fill in these metadata files by hand before submitting:\n");
    for name in checklist {
        out.push_str(&format!("  - {name}\n"));
    }
    out
}
