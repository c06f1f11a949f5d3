pub mod assets;
pub mod audio;
pub mod compose;
pub mod effects;
pub mod glyphs;
pub mod input;
pub mod intro;
pub mod manifest;
pub mod message;
pub mod output;
pub mod schema;
pub mod scroll;
pub mod tempo;
