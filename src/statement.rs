//! Statements, routine calls and positional parameter validation.

mod scanner;

use crate::error::SqlClientError;
use crate::types::{SqlType, SqlValue};

pub(crate) use scanner::count_placeholders;

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    /// Build a statement, checking that every `?` has exactly one value.
    ///
    /// # Errors
    /// Returns [`SqlClientError::ParameterMismatch`] when the placeholder count
    /// differs from `params.len()`.
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Result<Self, SqlClientError> {
        let sql = sql.into();
        let expected = count_placeholders(&sql);
        if expected != params.len() {
            return Err(SqlClientError::ParameterMismatch {
                expected,
                actual: params.len(),
            });
        }
        Ok(Self { sql, params })
    }

    /// Statement without parameters.
    ///
    /// # Errors
    /// Returns [`SqlClientError::ParameterMismatch`] if `sql` contains placeholders.
    pub fn plain(sql: impl Into<String>) -> Result<Self, SqlClientError> {
        Self::new(sql, Vec::new())
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

static NULL: SqlValue = SqlValue::Null;

/// One placeholder of a routine call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallParam {
    /// Value supplied by the caller.
    In(SqlValue),
    /// Value produced by the routine, decoded as the declared type.
    Out(SqlType),
    /// Supplied by the caller and overwritten by the routine.
    InOut(SqlValue, SqlType),
}

impl CallParam {
    /// Value bound for this placeholder (`NULL` for a pure OUT slot).
    #[must_use]
    pub fn bound_value(&self) -> &SqlValue {
        match self {
            CallParam::In(value) | CallParam::InOut(value, _) => value,
            CallParam::Out(_) => &NULL,
        }
    }

    /// Declared type when this placeholder produces a value.
    #[must_use]
    pub fn declared_output(&self) -> Option<SqlType> {
        match self {
            CallParam::In(_) => None,
            CallParam::Out(ty) | CallParam::InOut(_, ty) => Some(*ty),
        }
    }
}

/// A routine invocation such as `{ call customer_lastname(?, ?) }`.
///
/// ```rust
/// use async_sql::prelude::*;
///
/// let spec = CallSpec::new("{ call customer_lastname(?, ?) }")
///     .input("John")
///     .output(SqlType::Varchar);
/// assert_eq!(spec.output_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    sql: String,
    params: Vec<CallParam>,
}

impl CallSpec {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append an IN placeholder.
    #[must_use]
    pub fn input(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(CallParam::In(value.into()));
        self
    }

    /// Append an OUT placeholder.
    #[must_use]
    pub fn output(mut self, declared: SqlType) -> Self {
        self.params.push(CallParam::Out(declared));
        self
    }

    /// Append an INOUT placeholder.
    #[must_use]
    pub fn in_out(mut self, value: impl Into<SqlValue>, declared: SqlType) -> Self {
        self.params.push(CallParam::InOut(value.into(), declared));
        self
    }

    /// Merge separate IN and OUT lists positionally.
    ///
    /// Position `i` is OUT when `outputs[i]` is `Some`, INOUT when `inputs[i]`
    /// is also present and non-null, and IN otherwise. Missing IN entries bind
    /// `NULL`.
    #[must_use]
    pub fn from_lists(
        sql: impl Into<String>,
        inputs: &[SqlValue],
        outputs: &[Option<SqlType>],
    ) -> Self {
        let width = inputs.len().max(outputs.len());
        let params = (0..width)
            .map(|i| {
                let input = inputs.get(i).cloned().unwrap_or(SqlValue::Null);
                match outputs.get(i).copied().flatten() {
                    Some(ty) if input.is_null() => CallParam::Out(ty),
                    Some(ty) => CallParam::InOut(input, ty),
                    None => CallParam::In(input),
                }
            })
            .collect();
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[CallParam] {
        &self.params
    }

    /// Values bound for IN and INOUT placeholders, in placeholder order.
    #[must_use]
    pub fn in_values(&self) -> Vec<SqlValue> {
        self.params
            .iter()
            .filter(|p| !matches!(p, CallParam::Out(_)))
            .map(|p| p.bound_value().clone())
            .collect()
    }

    /// Declared types of the OUT and INOUT placeholders, in placeholder order.
    #[must_use]
    pub fn output_types(&self) -> Vec<SqlType> {
        self.params
            .iter()
            .filter_map(CallParam::declared_output)
            .collect()
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.declared_output().is_some())
            .count()
    }

    /// Check the placeholder count against the declared parameters.
    ///
    /// # Errors
    /// Returns [`SqlClientError::ParameterMismatch`] when they differ.
    pub fn validate(&self) -> Result<(), SqlClientError> {
        let expected = count_placeholders(&self.sql);
        if expected == self.params.len() {
            Ok(())
        } else {
            Err(SqlClientError::ParameterMismatch {
                expected,
                actual: self.params.len(),
            })
        }
    }
}
