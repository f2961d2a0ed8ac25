//! Formgate's backend web server: accepts form submissions only after a
//! reCAPTCHA verification passes, then appends them to the database.

pub mod api;
pub mod captcha;
pub mod config;
pub mod db;
pub mod submission;
