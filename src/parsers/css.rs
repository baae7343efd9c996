//! CSS 解析器模块
//!
//! 只做一件事：从元素的内联 `style` 属性中读出 `display` 声明，
//! 供默认样式判定器决定元素是块级还是行内。完整的层叠计算不在本 crate 的职责内。

use cssparser::{Delimiter, Parser, ParserInput};

/// 被视为行内的 `display` 关键字
pub const INLINE_DISPLAY_KEYWORDS: &[&str] = &[
    "inline",
    "inline-block",
    "inline-flex",
    "inline-grid",
    "inline-table",
    "contents",
];

/// `display` 关键字的归类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKeyword {
    Inline,
    Block,
}

/// `display` 声明存在但无法解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayParseError {
    pub style: String,
}

enum Declaration {
    Other,
    Display(String),
    Broken,
}

/// 解析内联样式中的 `display`
///
/// 返回 `Ok(None)` 表示没有 `display` 声明；多个声明时以最后一个为准。
/// 畸形的非 `display` 声明会被跳过，畸形的 `display` 声明返回错误。
///
/// ```rust
/// use dom_splice::parsers::css::{parse_display, DisplayKeyword};
///
/// assert_eq!(parse_display("color: red; display: inline-block"), Ok(Some(DisplayKeyword::Inline)));
/// assert_eq!(parse_display("display:flex !important"), Ok(Some(DisplayKeyword::Block)));
/// assert_eq!(parse_display("margin: 0"), Ok(None));
/// ```
pub fn parse_display(style: &str) -> Result<Option<DisplayKeyword>, DisplayParseError> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut display = None;

    while !parser.is_exhausted() {
        let declaration = parser.parse_until_after::<_, Declaration, ()>(Delimiter::Semicolon, |p| {
            let name = p.expect_ident()?.clone();
            p.expect_colon()?;

            let declaration = if name.eq_ignore_ascii_case("display") {
                match p.expect_ident() {
                    Ok(value) => Declaration::Display(value.to_ascii_lowercase()),
                    Err(_) => Declaration::Broken,
                }
            } else {
                Declaration::Other
            };

            // 吞掉剩余部分（如 !important），否则 parse_until_after 会报未耗尽
            while p.next().is_ok() {}
            Ok(declaration)
        });

        match declaration {
            Ok(Declaration::Display(value)) => display = Some(classify_keyword(&value)),
            Ok(Declaration::Broken) => {
                return Err(DisplayParseError {
                    style: style.to_string(),
                })
            }
            Ok(Declaration::Other) => {}
            Err(_) => {}
        }
    }

    Ok(display)
}

fn classify_keyword(value: &str) -> DisplayKeyword {
    if INLINE_DISPLAY_KEYWORDS.contains(&value) {
        DisplayKeyword::Inline
    } else {
        DisplayKeyword::Block
    }
}
