//! Export simulated observations to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or in a
//! statistics package (one row per individual-year).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::YearlyObservation;
use crate::error::AppError;

/// Write the observation table to a CSV file.
pub fn write_observations_csv(
    path: &Path,
    observations: &[YearlyObservation],
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;
    let mut file = BufWriter::new(file);

    writeln!(file, "individual,age,longevity,age_category,repro_prob,repro")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for o in observations {
        writeln!(
            file,
            "{},{},{},{},{:.6},{}",
            o.individual,
            o.age,
            o.longevity,
            o.age_category.map(|c| c.label()).unwrap_or(""),
            o.repro_prob,
            u8::from(o.repro),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;

    info!(path = %path.display(), rows = observations.len(), "wrote observations CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgeCategory;

    #[test]
    fn csv_has_header_and_one_row_per_observation() {
        let path = std::env::temp_dir().join(format!("senesce_obs_{}.csv", std::process::id()));
        let obs = vec![
            YearlyObservation {
                individual: 0,
                age: 3,
                longevity: 4,
                age_category: Some(AgeCategory::PreSenescent),
                repro_prob: 0.5,
                repro: true,
            },
            YearlyObservation {
                individual: 0,
                age: 4,
                longevity: 4,
                age_category: None,
                repro_prob: 0.55,
                repro: false,
            },
        ];
        write_observations_csv(&path, &obs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "individual,age,longevity,age_category,repro_prob,repro");
        assert_eq!(lines[1], "0,3,4,Pre-senescent,0.500000,1");
        assert_eq!(lines[2], "0,4,4,,0.550000,0");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unwritable_path_is_an_input_error() {
        let path = Path::new("/nonexistent-dir/for/sure/obs.csv");
        let err = write_observations_csv(path, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
