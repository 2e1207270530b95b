/// Build a positional parameter list from anything convertible to
/// [`SqlValue`](crate::SqlValue).
///
/// ```rust
/// use async_sql::{SqlValue, params};
///
/// let params = params!["Fox", 9, None::<i64>];
/// assert_eq!(params, vec![SqlValue::Text("Fox".into()), SqlValue::Int(9), SqlValue::Null]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}
