//! Simple example demonstrating the kivi store API.

use kivi::{KeyStore, StoreConfig, StoreError};

fn main() -> Result<(), StoreError> {
    // A small single-threaded store: 64 buckets, half of them backed by
    // pre-allocated chain-node blocks.
    let store = KeyStore::new(StoreConfig::new(64, 0.5, false))?;

    store.set("greeting", b"hello, kivi")?;
    let value = store.get("greeting")?;
    println!("greeting = {}", String::from_utf8_lossy(&value));

    // Overwrites keep the key, replace the bytes.
    store.set("greeting", b"updated")?;
    println!("greeting = {}", String::from_utf8_lossy(&store.get("greeting")?));

    // Binary values round-trip exactly, interior NULs included.
    store.set("binary", &[0x00, 0xff, 0x7e, 0x42])?;
    println!("binary  = {:?}", store.get("binary")?);

    store.delete("greeting")?;
    match store.get("greeting") {
        Err(StoreError::NotFound) => println!("greeting deleted"),
        other => println!("unexpected: {:?}", other),
    }

    println!("{} keys stored", store.len());
    println!("pool: {:?}", store.pool_stats());
    Ok(())
}
