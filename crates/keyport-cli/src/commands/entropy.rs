//! Entropy classification of seed phrase lengths.

use clap::Args;
use keyport_crypto::mnemonic::{is_standard_word_count, strength_for};

use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct EntropyArgs {
    /// Word counts to classify.
    #[arg(required = true)]
    pub words: Vec<usize>,
}

pub fn run(args: EntropyArgs, opts: &GlobalOpts) -> Result<(), String> {
    let rows: Vec<Vec<String>> = args
        .words
        .iter()
        .map(|&count| {
            let standard = if is_standard_word_count(count) {
                "yes"
            } else {
                "no (fallback)"
            };
            vec![
                count.to_string(),
                strength_for(count).to_string(),
                standard.to_string(),
            ]
        })
        .collect();
    output::print_table(&["words", "bits", "standard"], &rows, opts.json);
    Ok(())
}
