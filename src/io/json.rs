//! JSON records for sun-hours maps, face verdicts and growth results.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::sim::growth::GrowthResult;
use crate::sim::sampling::{FaceVerdict, SunHoursRecord};

fn write_pretty<W: Write, T: Serialize + ?Sized>(writer: W, value: &T, what: &str) -> Result<()> {
    serde_json::to_writer_pretty(writer, value).with_context(|| format!("Failed to write {what}"))
}

fn save<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_pretty(&mut writer, value, what)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {what}: {}", path.display()))
}

pub fn write_sun_hours<W: Write>(writer: W, records: &[SunHoursRecord]) -> Result<()> {
    write_pretty(writer, records, "sun hours")
}

pub fn write_face_verdicts<W: Write>(writer: W, records: &[FaceVerdict]) -> Result<()> {
    write_pretty(writer, records, "face verdicts")
}

pub fn write_growth_result<W: Write>(writer: W, result: &GrowthResult) -> Result<()> {
    write_pretty(writer, result, "growth result")
}

pub fn save_sun_hours(path: &Path, records: &[SunHoursRecord]) -> Result<()> {
    save(path, records, "sun hours")
}

pub fn save_face_verdicts(path: &Path, records: &[FaceVerdict]) -> Result<()> {
    save(path, records, "face verdicts")
}

pub fn save_growth_result(path: &Path, result: &GrowthResult) -> Result<()> {
    save(path, result, "growth result")
}

pub fn read_growth_result(path: &Path) -> Result<GrowthResult> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let result: GrowthResult = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse growth result: {}", path.display()))?;

    Ok(result)
}
