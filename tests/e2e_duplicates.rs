//! S2, S3: duplicate keys are all retrievable by insertion-order record
//! index, and empty keys/values are valid.

mod common;

use cdb::{Cdb, CdbConfig};
use common::MemoryStorage;

#[test]
fn s2_duplicate_keys_by_record_index() {
    let storage = MemoryStorage::new();
    {
        let mut writer = Cdb::create(storage.handle(), CdbConfig::default()).unwrap();
        writer.add(b"ALPHA", b"BRAVO").unwrap();
        writer.add(b"ALPHA", b"CHARLIE").unwrap();
        writer.add(b"ALPHA", b"DELTA").unwrap();
        writer.close().unwrap();
    }

    let mut reader = Cdb::open(storage.handle(), CdbConfig::default()).unwrap();
    assert_eq!(reader.count(b"ALPHA").unwrap(), 3);

    let fp0 = reader.lookup(b"ALPHA", 0).unwrap().unwrap();
    let fp1 = reader.lookup(b"ALPHA", 1).unwrap().unwrap();
    let fp2 = reader.lookup(b"ALPHA", 2).unwrap().unwrap();

    let mut buf = vec![0u8; fp0.length as usize];
    reader.read_at(fp0, &mut buf).unwrap();
    assert_eq!(buf, b"BRAVO");

    let mut buf = vec![0u8; fp1.length as usize];
    reader.read_at(fp1, &mut buf).unwrap();
    assert_eq!(buf, b"CHARLIE");

    let mut buf = vec![0u8; fp2.length as usize];
    reader.read_at(fp2, &mut buf).unwrap();
    assert_eq!(buf, b"DELTA");

    assert!(reader.lookup(b"ALPHA", 3).unwrap().is_none());
}

#[test]
fn s3_empty_key_and_value_are_valid() {
    let storage = MemoryStorage::new();
    {
        let mut writer = Cdb::create(storage.handle(), CdbConfig::default()).unwrap();
        writer.add(b"", b"").unwrap();
        writer.add(b"", b"X").unwrap();
        writer.add(b"", b"").unwrap();
        writer.close().unwrap();
    }

    let mut reader = Cdb::open(storage.handle(), CdbConfig::default()).unwrap();
    assert_eq!(reader.count(b"").unwrap(), 3);

    let fp0 = reader.lookup(b"", 0).unwrap().unwrap();
    assert_eq!(fp0.length, 0);

    let v1 = reader.get_value(b"");
    // get_value always returns record_index 0; use lookup directly for 1/2.
    assert!(v1.unwrap().unwrap().is_empty());

    let fp1 = reader.lookup(b"", 1).unwrap().unwrap();
    let mut buf = vec![0u8; fp1.length as usize];
    reader.read_at(fp1, &mut buf).unwrap();
    assert_eq!(buf, b"X");

    let fp2 = reader.lookup(b"", 2).unwrap().unwrap();
    assert_eq!(fp2.length, 0);
}

#[test]
fn duplicate_identical_pairs_each_retrievable() {
    let storage = MemoryStorage::new();
    {
        let mut writer = Cdb::create(storage.handle(), CdbConfig::default()).unwrap();
        writer.add(b"k", b"v").unwrap();
        writer.add(b"k", b"v").unwrap();
        writer.close().unwrap();
    }

    let mut reader = Cdb::open(storage.handle(), CdbConfig::default()).unwrap();
    assert_eq!(reader.count(b"k").unwrap(), 2);
    for i in 0..2 {
        let fp = reader.lookup(b"k", i).unwrap().unwrap();
        let mut buf = vec![0u8; fp.length as usize];
        reader.read_at(fp, &mut buf).unwrap();
        assert_eq!(buf, b"v");
    }
}
