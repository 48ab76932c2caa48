//! Encode and decode commands - the file bridge URL codec.

use docgate_core::{encode_file_url, extract_file_url};

/// Print the bridge path of a file URL.
pub fn encode(url: &str) -> anyhow::Result<()> {
    if !url.starts_with("file://") {
        eprintln!("Note: '{}' is not a file:// URL", url);
    }
    println!("{}", encode_file_url(url));
    Ok(())
}

/// Print the file URL carried by a bridge request path.
pub fn decode(path: &str) -> anyhow::Result<()> {
    println!("{}", extract_file_url(path)?);
    Ok(())
}
