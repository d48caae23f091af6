pub mod form;
pub mod question;

pub use form::{FormSpec, SpecIssue};
pub use question::{Question, QuestionType};
