//! 定位符与内容指纹

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};

use crate::parsers::html::{element_index_in_parent, get_node_name, get_parent_node};

/// 字段分隔符，避免 "ab"+"c" 与 "a"+"bc" 得到相同的摘要
const FIELD_SEPARATOR: &[u8] = &[0x1f];

/// 单元定位符：页面地址 + 结构路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub page_uri: String,
    pub path: String,
}

impl Locator {
    pub fn new(page_uri: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            page_uri: page_uri.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_uri, self.path)
    }
}

/// 计算节点的定位符
///
/// 路径由大写标签名和只计元素的同级序号组成，例如 `/HTML/0/BODY/1/P/2`。
/// 已脱离文档的节点只记录标签名。
pub fn locate(page_uri: &str, node: &Handle) -> Locator {
    let mut segments = Vec::new();
    let mut current = Some(node.clone());

    while let Some(element) = current {
        let Some(name) = get_node_name(&element) else {
            break;
        };
        let mut segment = format!("/{}", name.to_ascii_uppercase());
        if let Some(index) = element_index_in_parent(&element) {
            segment.push_str(&format!("/{}", index));
        }
        segments.push(segment);
        current = get_parent_node(&element);
    }

    segments.reverse();
    Locator::new(page_uri, segments.concat())
}

/// 内容指纹：BLAKE3(内容, 页面地址, 路径)，URL 安全的 base64 编码
///
/// ```rust
/// use dom_splice::translation::pipeline::fingerprint::{fingerprint, Locator};
///
/// let locator = Locator::new("https://example.com/", "/HTML/0/BODY/1/P/0");
/// let id = fingerprint("Hello", &locator);
/// assert_eq!(id, fingerprint("Hello", &locator));
/// assert_ne!(id, fingerprint("Hello!", &locator));
/// assert!(!id.contains('+') && !id.contains('/') && !id.contains('='));
/// ```
pub fn fingerprint(content: &str, locator: &Locator) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(locator.page_uri.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(locator.path.as_bytes());

    URL_SAFE_NO_PAD.encode(hasher.finalize().as_bytes())
}
