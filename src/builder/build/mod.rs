mod backends;
mod core;
mod helpers;
mod wrappers;
