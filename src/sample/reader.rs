use std::path::Path;

use crate::error::{Result, TreeError};
use super::formula::Formula;
use super::sample_struct::Sample;


/// A struct that reads a CSV file into [`Sample`].
///
/// # Example
/// ```no_run
/// use cartree::SampleReader;
///
/// let sample = SampleReader::default()
///     .file("/path/to/titanic.csv")
///     .has_header(true)
///     .formula("survived ~ .")
///     .weight_feature("n")
///     .read()
///     .unwrap();
/// ```
pub struct SampleReader<P> {
    file: Option<P>,
    has_header: bool,
    formula: Option<String>,
    target: Option<String>,
    weight: Option<String>,
}


impl<P> Default for SampleReader<P> {
    fn default() -> Self {
        Self {
            file: None,
            has_header: true,
            formula: None,
            target: None,
            weight: None,
        }
    }
}


impl<P> SampleReader<P> {
    /// Set the flag whether the file has the header row or not.
    /// Default is `true.`
    pub fn has_header(mut self, flag: bool) -> Self {
        self.has_header = flag;
        self
    }


    /// Set the model formula, e.g., `survived ~ sex + class`.
    pub fn formula<S: ToString>(mut self, formula: S) -> Self {
        self.formula = Some(formula.to_string());
        self
    }


    /// Set the target column and use every other column as a predictor.
    /// Same as `formula("<column> ~ .")`.
    pub fn target_feature<S: ToString>(mut self, column: S) -> Self {
        self.target = Some(column.to_string());
        self
    }


    /// Set the column that holds case weights.
    pub fn weight_feature<S: ToString>(mut self, column: S) -> Self {
        self.weight = Some(column.to_string());
        self
    }
}


impl<P> SampleReader<P>
    where P: AsRef<Path>
{
    /// Set the file name.
    pub fn file(mut self, file: P) -> Self {
        self.file = Some(file);
        self
    }


    /// Reads the file based on the arguments.
    /// This method consumes `self.`
    pub fn read(self) -> Result<Sample> {
        let file = self.file
            .ok_or_else(|| TreeError::config("the file name is not set"))?;

        let formula = match (self.formula, self.target) {
            (Some(formula), _) => Formula::parse(&formula)?,
            (None, Some(target)) => Formula::all(target),
            (None, None) => {
                return Err(TreeError::config(
                    "neither a formula nor a target column is specified. \
                     Use `SampleReader::formula` or \
                     `SampleReader::target_feature`."
                ));
            },
        };

        log::debug!("reading {} with `{formula}`", file.as_ref().display());
        Sample::from_csv(
            file, self.has_header, &formula, self.weight.as_deref()
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv_with_weights() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        let csv = "\
            class,sex,n,survived\n\
            1st,female,140,yes\n\
            1st,male,57,yes\n\
            3rd,male,75,yes\n\
            3rd,male,387,no\n";
        file.write_all(csv.as_bytes()).unwrap();
        file.flush().unwrap();

        let sample = SampleReader::default()
            .file(file.path())
            .formula("survived ~ .")
            .weight_feature("n")
            .read()
            .unwrap();

        assert_eq!(sample.shape(), (4, 2));
        assert_eq!(sample.total_weight(), 659.0);
        assert!(sample.target().is_class());
    }

    #[test]
    fn test_read_without_target() {
        let err = SampleReader::default()
            .file("does-not-matter.csv")
            .read()
            .unwrap_err();
        assert!(matches!(err, TreeError::Configuration { .. }));
    }
}
