//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use assert_cmd::Command;
    use serde_json::Value;

    const PAGE: &str = "<html><head><title>T</title></head><body>\
        <h1>Title</h1><p>Some <b>bold</b> text</p><script>x()</script>\
        </body></html>";

    fn units_from(output: &[u8]) -> Vec<Value> {
        let json: Value = serde_json::from_slice(output).unwrap();
        json.as_array().unwrap().clone()
    }

    #[test]
    fn units_from_stdin() {
        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .args(["-", "--units", "--page-url", "https://example.com/doc"])
            .write_stdin(PAGE)
            .assert()
            .success();

        let units = units_from(&assert.get_output().stdout);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0]["payload"], "Title");
        assert_eq!(units[0]["locator"]["page_uri"], "https://example.com/doc");
        assert_eq!(units[0]["locator"]["path"], "/HTML/0/BODY/1/H1/0");
        assert!(units[1]["payload"]
            .as_str()
            .unwrap()
            .contains("<b data-wt-index=\"1\" data-wt-display=\"inline\">bold</b>"));
    }

    #[test]
    fn units_from_file() {
        let path = std::env::temp_dir().join(format!("dom-splice-cli-{}.html", std::process::id()));
        std::fs::write(&path, PAGE).unwrap();

        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .arg(&path)
            .arg("--units")
            .assert()
            .success();
        std::fs::remove_file(&path).unwrap();

        let units = units_from(&assert.get_output().stdout);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0]["locator"]["page_uri"], "about:blank");
        // 32 字节摘要的 base64 编码
        assert_eq!(units[0]["id"].as_str().unwrap().len(), 43);
    }

    #[test]
    fn declared_charset_is_honored() {
        let mut page = b"<html><head><meta charset=\"windows-1252\"></head><body><p>caf".to_vec();
        page.push(0xe9);
        page.extend_from_slice(b"</p></body></html>");

        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .args(["-", "--units"])
            .write_stdin(page)
            .assert()
            .success();

        let units = units_from(&assert.get_output().stdout);
        assert_eq!(units[0]["payload"], "café");
    }

    #[test]
    fn env_docs_without_input() {
        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .arg("--env-docs")
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
        assert!(stdout.contains("DOM_SPLICE_LOG_LEVEL"));
        assert!(stdout.contains("DOM_SPLICE_MAX_BATCH_UNITS"));
    }

    #[test]
    fn init_config_is_loadable() {
        let path = std::env::temp_dir().join(format!("dom-splice-init-{}.toml", std::process::id()));

        Command::cargo_bin("dom-splice")
            .unwrap()
            .arg("--init-config")
            .arg(&path)
            .assert()
            .success();

        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .arg("-c")
            .arg(&path)
            .args(["-", "--units"])
            .write_stdin("<p>configured</p>")
            .assert()
            .success();
        std::fs::remove_file(&path).unwrap();

        let units = units_from(&assert.get_output().stdout);
        assert_eq!(units[0]["payload"], "configured");
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use assert_cmd::Command;

    #[test]
    fn missing_input_file() {
        let assert = Command::cargo_bin("dom-splice")
            .unwrap()
            .args(["/nonexistent/page.html", "--units"])
            .assert()
            .failure()
            .code(1);

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        assert!(stderr.contains("Error:"));
        assert!(stderr.contains("/nonexistent/page.html"));
    }

    #[test]
    fn invalid_page_url() {
        Command::cargo_bin("dom-splice")
            .unwrap()
            .args(["-", "--units", "--page-url", "not a url"])
            .write_stdin("<p>x</p>")
            .assert()
            .failure()
            .code(1);
    }

    #[test]
    fn missing_input_argument() {
        Command::cargo_bin("dom-splice")
            .unwrap()
            .assert()
            .failure()
            .code(2);
    }
}
