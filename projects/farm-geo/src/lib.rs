pub mod cli;
pub mod entities;
pub mod mapping;
pub mod web;
