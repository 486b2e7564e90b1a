mod dispatcher;
mod error;
mod logger;
mod packager;
mod paths;
mod snapshot;
