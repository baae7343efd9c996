use encoding_rs::Encoding;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

use crate::translation::error::{TranslationError, TranslationResult};

/// 序列化文档，必要时重新编码为文档字符集
pub fn serialize_document(dom: RcDom, document_encoding: String) -> TranslationResult<Vec<u8>> {
    let serializable: SerializableHandle = dom.document.into();
    let mut buf = serialize_with_scope(&serializable, TraversalScope::ChildrenOnly(None))?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

/// 节点子树的 HTML（不含节点自身）
pub fn inner_html(node: &Handle) -> String {
    let serializable: SerializableHandle = node.clone().into();
    render(&serializable, TraversalScope::ChildrenOnly(None))
}

/// 用 html5ever 的序列化器渲染任意实现了 `Serialize` 的树
pub fn render<T: Serialize>(node: &T, scope: TraversalScope) -> String {
    match serialize_with_scope(node, scope) {
        Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => {
            tracing::warn!("序列化失败: {}", e);
            String::new()
        }
    }
}

fn serialize_with_scope<T: Serialize>(node: &T, scope: TraversalScope) -> TranslationResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    serialize(&mut buf, node, opts)
        .map_err(|e| TranslationError::SerializationError(format!("无法序列化DOM: {e}")))?;
    Ok(buf)
}
