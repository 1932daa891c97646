fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod scenario;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use linkcast_protocol::{Command, FrameDecoder};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        fs::read(&path).unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_slice(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    // --- Command fixtures ---

    #[test]
    fn fixture_open_link() {
        let cmd = roundtrip_test::<Command>("open_link.json");
        assert_eq!(cmd, Command::open_one("https://example.com/dashboard"));
    }

    #[test]
    fn fixture_open_multiple_links() {
        let cmd = roundtrip_test::<Command>("open_multiple_links.json");
        assert_eq!(
            cmd.urls(),
            [
                "https://example.com/a",
                "https://example.com/b",
                "http://intranet.local/c"
            ]
        );
    }

    #[test]
    fn fixture_unknown_action_is_ignorable() {
        let err = linkcast_protocol::decode(&read_fixture("unknown_action.json")).unwrap_err();
        assert!(err.is_unknown_action(), "got {err}");
    }

    #[test]
    fn fixture_decodes_through_command_codec() {
        for name in ["open_link.json", "open_multiple_links.json"] {
            let bytes = read_fixture(name);
            let decoded = linkcast_protocol::decode(&bytes).unwrap();
            assert_eq!(decoded, serde_json::from_value(load_fixture(name)).unwrap());
        }
    }

    // --- Framing ---

    #[test]
    fn encoded_command_is_one_json_line() {
        let bytes = linkcast_protocol::encode(&Command::open_one("https://a.test")).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);

        // A peer that parses the whole read as one document still works.
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["action"], "open_link");
        assert_eq!(value["url"], "https://a.test");
    }

    #[test]
    fn legacy_back_to_back_stream() {
        let mut decoder = FrameDecoder::new();
        let commands: Vec<Command> = decoder
            .push(&read_fixture("legacy_stream.txt"))
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            commands,
            vec![
                Command::open_one("https://a.test"),
                Command::open_many(["https://b.test", "https://c.test"]).unwrap(),
                Command::open_one("https://d.test"),
            ]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn legacy_stream_byte_at_a_time() {
        let stream = read_fixture("legacy_stream.txt");
        let mut decoder = FrameDecoder::new();
        let mut commands = Vec::new();
        for byte in &stream {
            for frame in decoder.push(std::slice::from_ref(byte)) {
                commands.push(frame.unwrap());
            }
        }
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2], Command::open_one("https://d.test"));
    }

    #[test]
    fn newline_delimited_mixed_with_legacy() {
        let mut stream = linkcast_protocol::encode(&Command::open_one("https://x.test")).unwrap();
        stream.extend(read_fixture("legacy_stream.txt"));
        stream.extend(linkcast_protocol::encode(&Command::open_one("https://y.test")).unwrap());

        let mut decoder = FrameDecoder::new();
        let urls: Vec<String> = decoder
            .push(&stream)
            .into_iter()
            .flat_map(|frame| frame.unwrap().urls().to_vec())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://x.test",
                "https://a.test",
                "https://b.test",
                "https://c.test",
                "https://d.test",
                "https://y.test"
            ]
        );
    }
}
