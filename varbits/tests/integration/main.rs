mod buffer;
mod settings;
mod streams;
