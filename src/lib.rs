// task-app: authentication core for the task-list API

pub mod auth;
pub mod config;
pub mod web;
