//! Per-year reporting: a textual summary of the epidemic state plus the
//! concurrent-partner histogram as tab-separated rows.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csv::Writer;

use crate::error::StinetError;
use crate::params::DAYS_PER_YEAR;
use crate::state::State;

/// How many histogram bins are written per report.
const PARTNER_HISTOGRAM_BINS: usize = 10;

/// The two output channels: human-readable summaries and the
/// line-delimited partner-count records.
pub struct ReportSink {
    summary: Box<dyn Write>,
    partners: Writer<Box<dyn Write>>,
}

impl ReportSink {
    pub fn new(summary: Box<dyn Write>, partners: Box<dyn Write>) -> ReportSink {
        ReportSink {
            summary,
            partners: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(partners),
        }
    }

    pub fn to_stdout() -> ReportSink {
        ReportSink::new(Box::new(io::stdout()), Box::new(io::stdout()))
    }

    /// `<prefix>_summary.txt` and `<prefix>_partner_counts.tsv` in
    /// `directory`.
    pub fn to_files(directory: &Path, prefix: &str) -> Result<ReportSink, StinetError> {
        let summary = File::create(directory.join(format!("{prefix}_summary.txt")))?;
        let partners = File::create(directory.join(format!("{prefix}_partner_counts.tsv")))?;
        Ok(ReportSink::new(Box::new(summary), Box::new(partners)))
    }

    pub fn write_summary(&mut self, text: &str) -> Result<(), StinetError> {
        self.summary.write_all(text.as_bytes())?;
        self.summary.flush()?;
        Ok(())
    }

    fn write_partner_bin(
        &mut self,
        day: i32,
        n_partners: usize,
        n_persons: u64,
    ) -> Result<(), StinetError> {
        self.partners
            .write_record([day.to_string(), n_partners.to_string(), n_persons.to_string()])?;
        Ok(())
    }

    fn flush_partners(&mut self) -> Result<(), StinetError> {
        self.partners.flush()?;
        Ok(())
    }
}

/// Writes the export block: HIV and gonorrhea counts with percentages,
/// mean age of the HIV-positive against the whole population, and the
/// first ten bins of the concurrent-partner histogram.
pub fn export_results(state: &State, sink: &mut ReportSink) -> Result<(), StinetError> {
    let population = state.people.len();

    let mut n_hiv_positive: u64 = 0;
    let mut n_gn_positive: u64 = 0;
    let mut total_age_days: i64 = 0;
    let mut total_age_days_hiv_positive: i64 = 0;
    let mut partner_histogram = [0u64; PARTNER_HISTOGRAM_BINS];

    for person in state.people.iter() {
        let age_days = i64::from(state.time - person.day_of_birth());
        total_age_days += age_days;
        if person.hiv.infected {
            n_hiv_positive += 1;
            total_age_days_hiv_positive += age_days;
        }
        if person.gonorrhea.infected {
            n_gn_positive += 1;
        }
        let n_partners = state.relations.count_for(person.id());
        if n_partners < PARTNER_HISTOGRAM_BINS {
            partner_histogram[n_partners] += 1;
        }
    }

    let mean_age_years = total_age_days as f64 / population as f64 / DAYS_PER_YEAR;
    let mean_age_years_hiv_positive =
        total_age_days_hiv_positive as f64 / n_hiv_positive as f64 / DAYS_PER_YEAR;

    let summary = format!(
        "Export results, day {}:\n\
         HIV positive: {}/{} ({:.3}%)\n\
         GN positive: {}/{} ({:.3}%)\n\
         Mean age in years (HIV positive / overall): {:.2}/{:.2}\n\n",
        state.time,
        n_hiv_positive,
        population,
        100.0 * n_hiv_positive as f64 / population as f64,
        n_gn_positive,
        population,
        100.0 * n_gn_positive as f64 / population as f64,
        mean_age_years_hiv_positive,
        mean_age_years,
    );
    sink.write_summary(&summary)?;

    for (n_partners, &n_persons) in partner_histogram.iter().enumerate() {
        sink.write_partner_bin(state.time, n_partners, n_persons)?;
    }
    sink.flush_partners()?;
    Ok(())
}
