//! Utility functions shared by the coding modules

pub mod validation;
