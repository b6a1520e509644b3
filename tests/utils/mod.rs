#![allow(dead_code)]

pub mod logging;
pub mod mock;
pub mod output;
pub mod rand;
