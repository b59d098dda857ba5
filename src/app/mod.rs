//! Console host: a stand-in game server driven from stdin.

pub mod action;
pub mod commands;
pub mod event;
pub mod handler;
pub mod roster;
pub mod sink;
