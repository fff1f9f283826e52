use anyhow::Result;
use std::io::{self, BufWriter};
use std::sync::Arc;

use crate::external::ProcessToolRunner;
use crate::parallel::serve;

/// Body of `parcheck worker`: the frame protocol over stdio
pub fn execute() -> Result<()> {
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    serve(stdin, stdout, None, Arc::new(ProcessToolRunner))
}
