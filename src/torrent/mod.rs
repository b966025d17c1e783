mod file;
mod hash;
mod meta;
mod piece;
mod tree;
pub use hash::{info_hash, HashId, PiecesRoot};
pub use meta::{NodeAddr, TorrentInfo, TorrentInfoFile, TorrentMeta};
pub use piece::FilePieceInfo;

use crate::Result;

pub fn parse_torrent(buf: impl AsRef<[u8]>) -> Result<TorrentMeta> {
    TorrentMeta::from_bytes(buf.as_ref())
}



#[cfg(test)]
mod test {
    use super::testing::*;
    use super::*;
    use crate::bencode::Value;
    use crate::Error;
    use std::path::PathBuf;

    #[test]
    fn single_file_layout() {
        let meta = parse_torrent(torrent("a.iso", 64, &[1000])).unwrap();
        let info = meta.info().unwrap();
        assert_eq!(info.files.len(), 1);
        assert_eq!(info.length, info.files[0].length);
        assert_eq!(info.files[0].path, PathBuf::from("a.iso"));
        assert_eq!(info.pieces.len(), 16);
    }

    #[test]
    fn multi_file_layout() {
        let meta = parse_torrent(torrent("set", 100, &[250, 0, 51])).unwrap();
        let info = meta.info().unwrap();
        assert_eq!(info.length, info.files.iter().map(|f| f.length).sum::<u64>());
        assert_eq!(info.length, 301);
        assert_eq!(info.pieces.len() as u64, info.length.div_ceil(info.piece_length));
        assert_eq!(info.files[2].path, PathBuf::from("dir/file2"));
        assert_eq!(info.meta_version, 0);
        assert!(!info.private);
    }

    #[test]
    fn info_hash_over_raw_bytes() {
        // keys deliberately out of canonical order: the hash must follow the
        // source bytes, not a re-encoding
        let raw_info = b"d4:name1:x12:piece lengthi16e6:lengthi1e6:pieces20:aaaaaaaaaaaaaaaaaaaae";
        let mut buf = b"d8:announce4:http4:info".to_vec();
        buf.extend_from_slice(raw_info);
        buf.push(b'e');

        let meta = parse_torrent(&buf).unwrap();
        assert_eq!(meta.info_bytes(), raw_info);
        assert_eq!(meta.info_hash(), info_hash(raw_info));
        assert_eq!(meta.info_hash(), parse_torrent(&buf).unwrap().info_hash());
        assert_eq!(
            meta.info_hash().hex(),
            "1a8882887fed11625dcf8b72c6eb53a8d986cb48"
        );
    }

    #[test]
    fn envelope_normalized() {
        let tiers = Value::List(vec![
            Value::List(vec!["udp://b".into(), "udp://a".into()]),
            Value::List(vec!["http://c".into()]),
        ]);
        let nodes = Value::List(vec![
            Value::List(vec!["router.example".into(), 6881.into()]),
            Value::List(vec!["bad".into()]),
        ]);
        let buf = torrent_bytes(
            info_value("x", 16, &[10]),
            vec![
                ("announce", "udp://a".into()),
                ("announce-list", tiers),
                ("url-list", Value::List(vec!["https://z".into(), "https://m".into()])),
                ("nodes", nodes),
                ("comment", "hello".into()),
                ("created by", "mktorrent".into()),
                ("creation date", 1_600_000_000.into()),
                ("encoding", "UTF-8".into()),
            ],
        );
        let meta = parse_torrent(buf).unwrap();
        assert_eq!(meta.announce, "udp://a");
        assert_eq!(meta.announce_list, vec!["http://c", "udp://a", "udp://b"]);
        assert_eq!(meta.url_list, vec!["https://m", "https://z"]);
        assert_eq!(
            meta.nodes,
            vec![NodeAddr {
                host: "router.example".into(),
                port: 6881
            }]
        );
        assert_eq!(meta.comment, "hello");
        assert_eq!(meta.created_by, "mktorrent");
        assert_eq!(meta.encoding, "UTF-8");
        assert_eq!(meta.creation_date.unwrap().timestamp(), 1_600_000_000);

        let mut sorted = meta.announce_list.clone();
        sorted.sort();
        assert_eq!(sorted, meta.announce_list);
    }

    #[test]
    fn single_url_list_and_zero_date() {
        let buf = torrent_bytes(
            info_value("x", 16, &[10]),
            vec![
                ("url-list", "https://only".into()),
                ("creation date", 0.into()),
            ],
        );
        let meta = parse_torrent(buf).unwrap();
        assert_eq!(meta.url_list, vec!["https://only"]);
        assert_eq!(meta.creation_date, None);

        let meta = parse_torrent(torrent("x", 16, &[10])).unwrap();
        assert_eq!(meta.creation_date, None);
        assert!(meta.announce_list.is_empty());
    }

    #[test]
    fn legacy_saved_by() {
        let buf = torrent_bytes(
            info_value("x", 16, &[10]),
            vec![("saved by", "toolX".into()), ("save date", 1_234.into())],
        );
        let meta = parse_torrent(buf).unwrap();
        assert_eq!(meta.created_by, "toolX");
        assert_eq!(meta.creation_date.unwrap().timestamp(), 1_234);

        let buf = torrent_bytes(
            info_value("x", 16, &[10]),
            vec![
                ("created by", "std".into()),
                ("saved by", "toolX".into()),
                ("save date", "not a number".into()),
                ("creation date", 99.into()),
            ],
        );
        let meta = parse_torrent(buf).unwrap();
        assert_eq!(meta.created_by, "toolX");
        assert_eq!(meta.creation_date.unwrap().timestamp(), 99);
    }

    #[test]
    fn rejects_invalid() {
        let no_info: Value = [("announce", Value::from("x"))].into_iter().collect();
        let err = parse_torrent(crate::bencode::to_bytes(&no_info).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(matches!(
            parse_torrent(b"li1ee").unwrap_err(),
            Error::Decode(_)
        ));

        assert!(matches!(
            parse_torrent(b"d4:info").unwrap_err(),
            Error::Decode(_)
        ));
        assert!(parse_torrent(torrent("x", 0, &[10])).is_err());

        let bad_pieces: Value = [
            ("name", Value::from("x")),
            ("piece length", 16.into()),
            ("length", 40.into()),
            ("pieces", vec![0u8; 20].into()),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            parse_torrent(torrent_bytes(bad_pieces, vec![])).unwrap_err(),
            Error::InvalidTorrent(_)
        ));

        let wrong_type = torrent_bytes(
            info_value("x", 16, &[10]),
            vec![("announce-list", "flat".into())],
        );
        assert!(matches!(
            parse_torrent(wrong_type).unwrap_err(),
            Error::Deserialize(_)
        ));
    }

    #[test]
    fn legacy_codepage_text_is_kept() {
        // "你好" in GBK
        let gbk = vec![0xc4u8, 0xe3, 0xba, 0xc3];
        let mut info = info_value("x", 16, &[10, 6]);
        let Value::Dictionary(m) = &mut info else {
            unreachable!()
        };
        m.insert("name".into(), Value::Bytes(gbk.clone()));
        let files = m.get_mut("files").and_then(|f| match f {
            Value::List(l) => l.first_mut(),
            _ => None,
        });
        if let Some(Value::Dictionary(file)) = files {
            file.insert("path".into(), Value::List(vec![Value::Bytes(gbk.clone())]));
        }
        let buf = torrent_bytes(
            info,
            vec![
                ("encoding", "GBK".into()),
                ("comment", Value::Bytes(gbk.clone())),
            ],
        );

        let meta = parse_torrent(&buf).unwrap();
        let info = meta.info().unwrap();
        let lossy = String::from_utf8_lossy(&gbk).into_owned();
        assert_eq!(meta.encoding, "GBK");
        assert_eq!(meta.comment, lossy);
        assert_eq!(info.name, lossy);
        assert!(info.name.contains('\u{fffd}'));
        assert_eq!(info.files[0].path, PathBuf::from(&lossy));
        assert_eq!(info.length, 16);
        // hashed over the source bytes, not the replaced text
        let raw = crate::bencode::raw_dict_entry(&buf, "info").unwrap().unwrap();
        assert!(raw.windows(4).any(|w| w == gbk.as_slice()));
        assert_eq!(meta.info_hash(), info_hash(raw));
    }

    #[test]
    fn total_length_overflow_rejected() {
        let meta = parse_torrent(unhashed("two", &[i64::MAX, i64::MAX])).unwrap();
        assert_eq!(meta.info().unwrap().length, u64::MAX - 1);

        let err = parse_torrent(unhashed("three", &[i64::MAX; 3])).unwrap_err();
        assert!(matches!(err, Error::InvalidTorrent(_)));
        assert!(parse_torrent(unhashed("negative", &[-1])).is_err());
    }

    #[test]
    fn absolute_segments_stay_relative() {
        let mut info = info_value("set", 16, &[10, 6]);
        let Value::Dictionary(m) = &mut info else {
            unreachable!()
        };
        if let Some(Value::List(files)) = m.get_mut("files") {
            if let Some(Value::Dictionary(file)) = files.get_mut(1) {
                file.insert(
                    "path".into(),
                    Value::List(vec!["dir".into(), "/etc/passwd".into()]),
                );
            }
        }
        let meta = parse_torrent(torrent_bytes(info.clone(), vec![])).unwrap();
        let files = &meta.info().unwrap().files;
        assert_eq!(files[1].path, PathBuf::from("dir/etc/passwd"));

        if let Value::Dictionary(m) = &mut info {
            if let Some(Value::List(files)) = m.get_mut("files") {
                if let Some(Value::Dictionary(file)) = files.get_mut(0) {
                    file.insert("path".into(), Value::List(vec!["..".into(), "x".into()]));
                }
            }
        }
        assert!(matches!(
            parse_torrent(torrent_bytes(info, vec![])).unwrap_err(),
            Error::InvalidTorrent(_)
        ));
    }

    #[test]
    fn v2_file_tree() {
        let leaf = |length: i64, root: u8| -> Value {
            let entry: Value = [
                ("length", Value::from(length)),
                ("pieces root", vec![root; 32].into()),
            ]
            .into_iter()
            .collect();
            [("", entry)].into_iter().collect()
        };
        let tree: Value = [("a", leaf(20, 1)), ("b", leaf(5, 2))].into_iter().collect();
        let info: Value = [
            ("name", Value::from("v2")),
            ("piece length", 16.into()),
            ("meta version", 2.into()),
            ("file tree", tree),
        ]
        .into_iter()
        .collect();
        let meta = parse_torrent(torrent_bytes(info, vec![])).unwrap();
        let info = meta.info().unwrap();
        assert_eq!(info.meta_version, 2);
        assert_eq!(info.length, 25);
        assert!(info.pieces.is_empty());
        assert_eq!(info.files[1].pieces_root, PiecesRoot::from_slice(&[2u8; 32]));
        assert_eq!(info.first_piece(&info.files[1]).hash, None);
    }

    #[test]
    fn hybrid_attaches_roots() {
        let mut info = info_value("set", 100, &[250, 51]);
        let leaf: Value = [(
            "",
            [
                ("length", Value::from(51)),
                ("pieces root", vec![9u8; 32].into()),
            ]
            .into_iter()
            .collect::<Value>(),
        )]
        .into_iter()
        .collect();
        let dir: Value = [("file1", leaf)].into_iter().collect();
        let tree: Value = [("dir", dir)].into_iter().collect();
        if let Value::Dictionary(m) = &mut info {
            m.insert("file tree".into(), tree);
            m.insert("meta version".into(), 2.into());
            m.insert("private".into(), 1.into());
        }
        let meta = parse_torrent(torrent_bytes(info, vec![])).unwrap();
        let info = meta.info().unwrap();
        assert_eq!(info.files[0].pieces_root, None);
        assert_eq!(info.files[1].pieces_root, PiecesRoot::from_slice(&[9u8; 32]));
        assert_eq!(info.pieces.len(), 4);
        assert!(info.private);
    }
}
