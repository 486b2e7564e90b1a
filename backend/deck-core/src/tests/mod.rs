mod auth;
mod collaborators;
mod config;
mod protocol;
mod settings;
