#![allow(missing_docs)]

pub mod answers;
pub mod rule;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use answers::{AnswerMap, FieldMap, ValidationError, ValidationErrors, answer_map};
pub use rule::{Combinator, Condition, Operator, Rule};
pub use spec::{FormSpec, Question, QuestionType, SpecIssue};
pub use validate::validate;
pub use visibility::{VisibilityMap, resolve_visibility, visible_questions};
