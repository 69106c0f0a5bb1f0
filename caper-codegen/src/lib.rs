//! Output plumbing shared by both code generators: each backend gets a
//! writer that turns a logical artifact name (`"parser"`, `"table"`) into
//! a `dyn Write`, so a single backend implementation can run once against
//! a CLI that writes files and once against a test harness that collects
//! strings in memory.

use std::io::Write;

pub mod templating;
pub use templating::{Template, TemplateWriter};

/// Opens one `dyn Write` per named artifact on demand. `open` is called
/// once per `generate_code` call with the artifact's logical name (no
/// extension); the caller decides what that maps to (a file path, an
/// in-memory buffer, ...).
pub struct GeneratedCodeWriter<'open> {
    open: Box<dyn FnMut(&str) -> std::io::Result<Box<dyn Write + 'open>> + 'open>,
}

impl<'open> GeneratedCodeWriter<'open> {
    pub fn with_default<F, W>(mut open: F) -> Self
    where
        F: FnMut(&str) -> std::io::Result<W> + 'open,
        W: Write + 'open,
    {
        GeneratedCodeWriter {
            open: Box::new(move |name| open(name).map(|w| Box::new(w) as Box<dyn Write + 'open>)),
        }
    }

    pub fn generate_code<G>(&mut self, name: &str, code_generator: G) -> std::io::Result<()>
    where
        G: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        let mut writer = (self.open)(name)?;
        code_generator(writer.as_mut())
    }
}
