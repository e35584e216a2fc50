pub mod question;
pub mod test_session;
