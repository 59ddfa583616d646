mod attribute_value;
mod condition;
mod eval;
mod feature;
mod operator;
mod path;
mod rule;
mod test_common;
mod util;

pub use attribute_value::*;
pub use eval::*;
pub use feature::*;
pub use operator::{Op, UnknownOperator};
pub use path::*;
pub use rule::{Error as RuleError, Rule};
