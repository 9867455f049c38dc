//! Archive output checked against an independent CRC implementation and
//! the raw ZIP layout.

use fundzip::zip::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader, ZipBuilder, crc32,
};
use fundzip::{ArchiveEntry, ZipReader, create_zip_buffer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const ISO_HDLC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

fn u16_at(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

#[test]
fn empty_archive_is_a_bare_eocd() {
    let archive = create_zip_buffer(&[]).unwrap();
    let mut expected = vec![0x50, 0x4B, 0x05, 0x06];
    expected.extend([0u8; 18]);
    assert_eq!(archive, expected);
    assert!(ZipReader::new(&archive).verify().unwrap().is_empty());
}

#[test]
fn walks_the_layout_by_hand() {
    let entries = vec![
        ArchiveEntry::new("a.txt", b"alpha".to_vec()),
        ArchiveEntry::new("dir/b.bin", vec![0u8; 300]),
        ArchiveEntry::new("empty", Vec::new()),
    ];
    let archive = create_zip_buffer(&entries).unwrap();

    let mut pos = 0usize;
    let mut local_offsets = Vec::new();
    for entry in &entries {
        local_offsets.push(pos as u32);
        assert_eq!(u32_at(&archive, pos), LocalFileHeader::SIGNATURE);
        assert_eq!(u16_at(&archive, pos + 8), 0, "method must be stored");
        assert_eq!(u32_at(&archive, pos + 14), ISO_HDLC.checksum(&entry.data));
        assert_eq!(u32_at(&archive, pos + 18), entry.data.len() as u32);
        assert_eq!(u32_at(&archive, pos + 22), entry.data.len() as u32);
        let name_len = u16_at(&archive, pos + 26) as usize;
        assert_eq!(u16_at(&archive, pos + 28), 0);
        assert_eq!(
            &archive[pos + 30..pos + 30 + name_len],
            entry.name.as_bytes()
        );
        pos += 30 + name_len;
        assert_eq!(&archive[pos..pos + entry.data.len()], &entry.data[..]);
        pos += entry.data.len();
    }

    let cd_start = pos;
    for (entry, offset) in entries.iter().zip(&local_offsets) {
        assert_eq!(u32_at(&archive, pos), CentralDirectoryHeader::SIGNATURE);
        assert_eq!(u32_at(&archive, pos + 42), *offset);
        pos += 46 + entry.name.len();
    }

    let eocd = pos;
    assert_eq!(u32_at(&archive, eocd), EndOfCentralDirectory::SIGNATURE);
    assert_eq!(u16_at(&archive, eocd + 8), 3);
    assert_eq!(u16_at(&archive, eocd + 10), 3);
    assert_eq!(u32_at(&archive, eocd + 12), (eocd - cd_start) as u32);
    assert_eq!(u32_at(&archive, eocd + 16), cd_start as u32);
    assert_eq!(archive.len(), eocd + 22);
}

#[test]
fn fixed_timestamp_makes_output_reproducible() {
    let when = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 30, 12)
        .unwrap();
    let builder = ZipBuilder::with_timestamp(&when);
    let entries = [ArchiveEntry::new("x", b"same".to_vec())];
    assert_eq!(
        builder.build(&entries).unwrap(),
        builder.build(&entries).unwrap()
    );

    let archive = builder.build(&entries).unwrap();
    let listed = ZipReader::new(&archive).list_files().unwrap();
    assert_eq!(listed[0].modified.ymd(), (2024, 3, 9));
    assert_eq!(listed[0].modified.hms(), (14, 30, 12));
}

proptest! {
    #[test]
    fn crc_matches_reference(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        prop_assert_eq!(crc32(&data), ISO_HDLC.checksum(&data));
    }

    #[test]
    fn archives_read_back_in_order(
        files in proptest::collection::vec(
            ("[a-z]{1,12}", proptest::collection::vec(any::<u8>(), 0..512)),
            0..8,
        )
    ) {
        let entries: Vec<ArchiveEntry> = files
            .iter()
            .enumerate()
            .map(|(i, (name, data))| ArchiveEntry::new(format!("{i}/{name}"), data.clone()))
            .collect();
        let archive = create_zip_buffer(&entries).unwrap();

        let reader = ZipReader::new(&archive);
        let listed = reader.verify().unwrap();
        prop_assert_eq!(listed.len(), entries.len());
        for (entry, listed) in entries.iter().zip(&listed) {
            prop_assert_eq!(&listed.file_name, &entry.name);
            prop_assert_eq!(reader.extract(listed).unwrap(), &entry.data[..]);
        }
    }
}
