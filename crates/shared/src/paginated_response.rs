//! # ページネーション
//!
//! 一覧系の問い合わせで使うページ指定と、総件数付きの結果。
//! ページ番号は 1 始まり。範囲外の値は既定値に丸める。

use serde::{Deserialize, Serialize};

/// 既定のページサイズ
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// ページサイズの上限
pub const MAX_PAGE_SIZE: u32 = 100;

/// ページ指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page: u32,
    size: u32,
}

impl Page {
    /// ページ指定を作成する
    ///
    /// `page` が 0 の場合は 1、`size` が 0 または上限超過の場合は既定値にする。
    pub fn new(page: u32, size: u32) -> Self {
        let page = page.max(1);
        let size = if size == 0 || size > MAX_PAGE_SIZE {
            DEFAULT_PAGE_SIZE
        } else {
            size
        };
        Self { page, size }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// 総件数付きの一覧結果
///
/// ## JSON 形式
///
/// ```json
/// {
///   "items": [...],
///   "total": 42,
///   "page": 1,
///   "size": 20
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page:  u32,
    pub size:  u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page(),
            size: page.size(),
        }
    }

    /// 全件を保持しているコレクションから 1 ページ分を切り出す
    pub fn from_all(all: Vec<T>, page: Page) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .collect();
        Self::new(items, total, page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page:  self.page,
            size:  self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_範囲外のページ指定は既定値に丸められる() {
        assert_eq!(Page::new(0, 0), Page::new(1, DEFAULT_PAGE_SIZE));
        assert_eq!(Page::new(3, 500).size(), DEFAULT_PAGE_SIZE);
        assert_eq!(Page::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_全件から指定ページを切り出せる() {
        let page = Paginated::from_all((1..=5).collect::<Vec<i32>>(), Page::new(2, 2));

        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn test_json形式でシリアライズされる() {
        let page = Paginated::new(vec!["a"], 1, Page::default());
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "items": ["a"], "total": 1, "page": 1, "size": 20 })
        );
    }
}
