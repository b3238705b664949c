//! A tiny model formula: `target ~ a + b` or `target ~ .`
use crate::error::{Result, TreeError};

use std::fmt;
use std::str::FromStr;


/// Which predictors the formula selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predictors {
    /// `.`: every column except the target (and the weight column).
    All,
    /// An explicit, ordered list of columns.
    Columns(Vec<String>),
}


/// Names the target column and the predictor columns.
///
/// ```
/// use cartree::Formula;
///
/// let formula = Formula::parse("survived ~ .").unwrap();
/// assert_eq!(formula.target(), "survived");
///
/// let columns = ["class", "sex", "survived"];
/// assert_eq!(formula.select(&columns).unwrap(), vec!["class", "sex"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    target: String,
    predictors: Predictors,
}


impl Formula {
    /// `target ~ .`
    pub fn all<S: ToString>(target: S) -> Self {
        Self {
            target: target.to_string(),
            predictors: Predictors::All,
        }
    }


    /// `target ~ c1 + c2 + ...`
    pub fn columns<S, T>(target: S, columns: &[T]) -> Self
        where S: ToString,
              T: ToString,
    {
        let columns = columns.iter()
            .map(|c| c.to_string())
            .collect();
        Self {
            target: target.to_string(),
            predictors: Predictors::Columns(columns),
        }
    }


    /// Parse `lhs ~ rhs`.
    /// `rhs` is `.` or a `+`-separated list of column names.
    pub fn parse(formula: &str) -> Result<Self> {
        let (lhs, rhs) = formula.split_once('~')
            .ok_or_else(|| {
                TreeError::config(format!("formula `{formula}` has no `~`"))
            })?;

        let target = lhs.trim();
        if target.is_empty() {
            return Err(TreeError::config(
                format!("formula `{formula}` has no target")
            ));
        }

        let rhs = rhs.trim();
        if rhs == "." {
            return Ok(Self::all(target));
        }

        let columns = rhs.split('+')
            .map(|c| c.trim())
            .collect::<Vec<_>>();
        if columns.iter().any(|c| c.is_empty()) {
            return Err(TreeError::config(
                format!("formula `{formula}` has an empty predictor")
            ));
        }
        if columns.contains(&target) {
            return Err(TreeError::config(
                format!("target `{target}` also appears as a predictor")
            ));
        }

        Ok(Self::columns(target, &columns[..]))
    }


    /// The response column.
    pub fn target(&self) -> &str {
        &self.target
    }


    /// The right-hand side.
    pub fn predictors(&self) -> &Predictors {
        &self.predictors
    }


    /// Resolve the predictor names against the available columns.
    /// `.` keeps the column order of `available`.
    pub fn select<S: AsRef<str>>(&self, available: &[S])
        -> Result<Vec<String>>
    {
        self.select_excluding(available, None)
    }


    /// Same as [`Formula::select`], but never selects `excluded`
    /// (the weight column) through `.`.
    pub fn select_excluding<S: AsRef<str>>(
        &self,
        available: &[S],
        excluded: Option<&str>,
    ) -> Result<Vec<String>>
    {
        let has = |name: &str| available.iter().any(|a| a.as_ref() == name);

        if !has(self.target.as_str()) {
            return Err(TreeError::schema(
                format!("target column `{}` does not exist", self.target)
            ));
        }

        match &self.predictors {
            Predictors::All => {
                let names = available.iter()
                    .map(|a| a.as_ref())
                    .filter(|&a| a != self.target && Some(a) != excluded)
                    .map(|a| a.to_string())
                    .collect();
                Ok(names)
            },
            Predictors::Columns(columns) => {
                if let Some(c) = columns.iter().find(|c| !has(c.as_str())) {
                    return Err(TreeError::schema(
                        format!("predictor column `{c}` does not exist")
                    ));
                }
                Ok(columns.clone())
            },
        }
    }
}


impl FromStr for Formula {
    type Err = TreeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}


impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predictors {
            Predictors::All => write!(f, "{} ~ .", self.target),
            Predictors::Columns(columns) => {
                write!(f, "{} ~ {}", self.target, columns.join(" + "))
            },
        }
    }
}
