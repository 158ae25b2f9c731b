//! Catalog HTML extraction
//!
//! Pure functions over decoded page text — no network access. The search
//! page yields ranked [`SearchResult`]s; the detail page (concatenated with
//! the hash fragment the site serves from a separate endpoint) yields a
//! [`ReleaseDetail`]. Missing soft fields (genre, size, seeders) collapse to
//! sentinel strings; a missing release id or info hash is a hard parse error.

use crate::error::{Error, Result};
use crate::types::{ReleaseDetail, SearchResult, TITLE_LIMIT};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Marker the site renders on an empty (but well-formed) search response
const NO_RESULTS_MARKER: &str = "ничего не найдено";

#[allow(clippy::expect_used)]
static RELEASE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=(\d+)").expect("static regex"));

#[allow(clippy::expect_used)]
static INFO_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Инфо хеш:\s*([0-9A-Fa-f]{40})\b").expect("static regex"));

#[allow(clippy::expect_used)]
static TITLE_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[`_|"&;]|quot"#).expect("static regex"));

/// Selectors are compile-time constants; a parse failure is a programmer error.
fn selector(css: &str) -> Selector {
    #[allow(clippy::expect_used)]
    Selector::parse(css).expect("static css selector")
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Normalize the alternate Cyrillic letter the site mixes in: `ё`/`Ё`
/// become `е`/`Е` so display and follow-up searches stay consistent.
pub fn normalize_cyrillic(text: &str) -> String {
    text.replace('ё', "е").replace('Ё', "Е")
}

/// Extract the numeric release id from an href or page URL.
fn extract_release_id(source: &str) -> Option<String> {
    RELEASE_ID_RE
        .captures(source)
        .map(|caps| caps[1].to_string())
}

/// Truncate a title to [`TITLE_LIMIT`] characters, appending "..." if cut.
fn truncate_title(title: &str) -> String {
    let mut chars = title.chars();
    let head: String = chars.by_ref().take(TITLE_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse a decoded search page into ranked results.
///
/// Rows missing a title or a release id are dropped. Results are sorted by
/// descending seeder count; the sort is stable, so ties keep document order.
/// A well-formed "nothing found" page yields an empty vector; a page without
/// the results table at all (e.g. an error page) is a parse error.
pub fn parse_search_results(html: &str) -> Result<Vec<SearchResult>> {
    let doc = Html::parse_document(html);

    let table_sel = selector("table.t_peer");
    if doc.select(&table_sel).next().is_none() {
        if html.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(Error::Parse {
            reason: "search results table not found".to_string(),
        });
    }

    let row_sel = selector("table.t_peer tr.bg");
    let title_sel = selector("td.nam a");
    let seeders_sel = selector("td.sl_s");
    let size_sel = selector("td.s");

    let mut results = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(link) = row.select(&title_sel).next() else {
            tracing::debug!("dropping search row without a title link");
            continue;
        };
        let title = normalize_cyrillic(element_text(&link).trim());
        if title.is_empty() {
            continue;
        }
        let Some(release_id) = link.value().attr("href").and_then(extract_release_id) else {
            tracing::debug!(title = %title, "dropping search row without a release id");
            continue;
        };

        let seeders = row
            .select(&seeders_sel)
            .next()
            .and_then(|el| element_text(&el).trim().parse::<u32>().ok());

        // The second td.s cell carries the size; the first holds comments.
        let size = row
            .select(&size_sel)
            .nth(1)
            .map(|el| element_text(&el).trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Размер не найден".to_string());

        results.push(SearchResult {
            release_id,
            title: truncate_title(&title),
            size,
            seeders,
        });
    }

    // Vec::sort_by_key is stable: ties keep their document order.
    results.sort_by_key(|r| std::cmp::Reverse(r.rank()));
    Ok(results)
}

/// Parse a release's combined detail source into a [`ReleaseDetail`].
///
/// `html` is the decoded detail page with the hash fragment appended (the
/// site serves the info hash from a separate endpoint). The release id comes
/// from `source_url`. Genre, size and seeders fall back to sentinels when
/// the markup lacks them; a missing id or 40-hex info hash is a hard error.
pub fn parse_release_detail(html: &str, source_url: &str) -> Result<ReleaseDetail> {
    let release_id = extract_release_id(source_url).ok_or_else(|| Error::Parse {
        reason: format!("no release id in URL {source_url}"),
    })?;

    let info_hash = INFO_HASH_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::Parse {
            reason: format!("info hash not found for release {release_id}"),
        })?;

    let doc = Html::parse_document(html);

    let title_sel = selector("title");
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| clean_detail_title(&element_text(&el)))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Раздача-{release_id}"));

    let genre_sel = selector("a.lnks_tobrs");
    let genre = doc
        .select(&genre_sel)
        .next()
        .map(|el| normalize_cyrillic(element_text(&el).trim()))
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| "Не указан".to_string());

    let size = find_size(&doc).unwrap_or_else(|| "Размер не найден".to_string());

    let seeders_sel = selector(r#"a[onclick*="Раздают"]"#);
    let seeders = doc
        .select(&seeders_sel)
        .next()
        .and_then(|el| {
            element_text(&el)
                .split_whitespace()
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Нет данных".to_string());

    Ok(ReleaseDetail {
        release_id,
        title,
        genre,
        size,
        seeders,
        info_hash,
    })
}

/// The page `<title>` carries decoration: stray punctuation, alternate
/// translations after `/`, and the site's `ё` spelling.
fn clean_detail_title(raw: &str) -> String {
    let stripped = TITLE_NOISE_RE.replace_all(raw, "");
    let first = stripped.split('/').next().unwrap_or("");
    normalize_cyrillic(first.trim())
}

/// The size lives in the `.floatright` cell of the `li` labeled "Вес".
fn find_size(doc: &Html) -> Option<String> {
    let li_sel = selector("li");
    let float_sel = selector(".floatright");
    for li in doc.select(&li_sel) {
        if !element_text(&li).contains("Вес") {
            continue;
        }
        if let Some(el) = li.select(&float_sel).next() {
            let text = element_text(&el).trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn search_row(id: &str, title: &str, size: &str, seeders: &str) -> String {
        format!(
            r#"<tr class="bg">
                <td class="nam"><a href="/details.php?id={id}">{title}</a></td>
                <td class="s">12</td>
                <td class="s">{size}</td>
                <td class="sl_s">{seeders}</td>
                <td class="sl_p">3</td>
            </tr>"#
        )
    }

    fn search_page(rows: &[String]) -> String {
        format!(
            r#"<html><body><div class="bx2_0">
            <table class="t_peer w100p"><tbody>{}</tbody></table>
            </div></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn results_sort_descending_by_seeders() {
        let html = search_page(&[
            search_row("100", "Первый", "1.0 ГБ", "5"),
            search_row("200", "Второй", "2.0 ГБ", "50"),
            search_row("300", "Третий", "3.0 ГБ", "1"),
        ]);
        let results = parse_search_results(&html).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.release_id.as_str()).collect();
        assert_eq!(ids, vec!["200", "100", "300"]);
    }

    #[test]
    fn ties_keep_document_order() {
        let html = search_page(&[
            search_row("1", "A", "1 ГБ", "7"),
            search_row("2", "B", "1 ГБ", "7"),
            search_row("3", "C", "1 ГБ", "9"),
            search_row("4", "D", "1 ГБ", "7"),
        ]);
        let results = parse_search_results(&html).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.release_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2", "4"], "stable sort must keep ties in order");
    }

    #[test]
    fn long_titles_truncate_to_thirty_chars_plus_ellipsis() {
        let long = "Очень длинное название раздачи которое не помещается";
        assert!(long.chars().count() > TITLE_LIMIT);
        let html = search_page(&[search_row("1", long, "1 ГБ", "2")]);
        let results = parse_search_results(&html).unwrap();
        let title = &results[0].title;
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), TITLE_LIMIT + 3);
        let expected: String = long.chars().take(TITLE_LIMIT).collect();
        assert_eq!(title, &format!("{expected}..."));
    }

    #[test]
    fn short_titles_are_unchanged() {
        let html = search_page(&[search_row("1", "Матрица", "1 ГБ", "2")]);
        let results = parse_search_results(&html).unwrap();
        assert_eq!(results[0].title, "Матрица");
    }

    #[test]
    fn rows_without_title_or_id_are_dropped() {
        let no_href = r#"<tr class="bg">
            <td class="nam"><a>Без ссылки</a></td>
            <td class="s">1</td><td class="s">1 ГБ</td><td class="sl_s">4</td>
        </tr>"#
            .to_string();
        let empty_title = search_row("9", "  ", "1 ГБ", "4");
        let bad_href = r#"<tr class="bg">
            <td class="nam"><a href="/details.php">Нет ид</a></td>
            <td class="s">1</td><td class="s">1 ГБ</td><td class="sl_s">4</td>
        </tr>"#
            .to_string();
        let good = search_row("5", "Годная", "1 ГБ", "4");
        let html = search_page(&[no_href, empty_title, bad_href, good]);
        let results = parse_search_results(&html).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].release_id, "5");
    }

    #[test]
    fn non_numeric_seeders_become_unknown_and_rank_last() {
        let html = search_page(&[
            search_row("1", "A", "1 ГБ", "—"),
            search_row("2", "B", "1 ГБ", "3"),
        ]);
        let results = parse_search_results(&html).unwrap();
        assert_eq!(results[0].release_id, "2");
        assert_eq!(results[1].seeders, None);
    }

    #[test]
    fn missing_size_cell_gets_sentinel() {
        let row = r#"<tr class="bg">
            <td class="nam"><a href="/details.php?id=8">Раздача</a></td>
            <td class="s">1</td>
            <td class="sl_s">4</td>
        </tr>"#
            .to_string();
        let results = parse_search_results(&search_page(&[row])).unwrap();
        assert_eq!(results[0].size, "Размер не найден");
    }

    #[test]
    fn yo_letters_normalize_in_titles() {
        let html = search_page(&[search_row("1", "Ёлки зелёные", "1 ГБ", "2")]);
        let results = parse_search_results(&html).unwrap();
        assert_eq!(results[0].title, "Елки зеленые");
    }

    #[test]
    fn no_results_page_is_empty_not_error() {
        let html = "<html><body>По Вашему запросу ничего не найдено</body></html>";
        let results = parse_search_results(html).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn page_without_results_table_is_parse_error() {
        let html = "<html><body><form><input name=\"username\"></form></body></html>";
        let err = parse_search_results(html).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    // -----------------------------------------------------------------
    // Release detail
    // -----------------------------------------------------------------

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn detail_page(title: &str, genre: &str, size: &str, seeders: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
            <a class="lnks_tobrs" href="/browse.php?g=1">{genre}</a>
            <ul>
              <li>Что-то еще<span class="floatright">ignored</span></li>
              <li>Вес<span class="floatright">{size}</span></li>
            </ul>
            <a onclick="showPeers('Раздают')">Раздают {seeders}</a>
            </body></html>"#
        )
    }

    fn with_hash(page: &str) -> String {
        format!("{page}\nИнфо хеш: {HASH}")
    }

    #[test]
    fn detail_parses_all_fields() {
        let page = with_hash(&detail_page(
            "Матрица / The Matrix / 1999 / BDRip",
            "Фантастика",
            "2.3 ГБ",
            "17",
        ));
        let detail =
            parse_release_detail(&page, "https://kinozal.tv/details.php?id=1234567").unwrap();
        assert_eq!(detail.release_id, "1234567");
        assert_eq!(detail.title, "Матрица");
        assert_eq!(detail.genre, "Фантастика");
        assert_eq!(detail.size, "2.3 ГБ");
        assert_eq!(detail.seeders, "17");
        assert_eq!(detail.info_hash, HASH);
    }

    #[test]
    fn detail_title_strips_noise_and_normalizes() {
        let page = with_hash(&detail_page(
            "`Зелёная _миля\" / The Green Mile",
            "Драма",
            "1 ГБ",
            "3",
        ));
        let detail = parse_release_detail(&page, "/details.php?id=2").unwrap();
        assert_eq!(detail.title, "Зеленая миля");
    }

    #[test]
    fn missing_soft_fields_get_sentinels() {
        let page = with_hash(
            "<html><head><title>Раздача</title></head><body>пусто</body></html>",
        );
        let detail = parse_release_detail(&page, "/details.php?id=3").unwrap();
        assert_eq!(detail.genre, "Не указан");
        assert_eq!(detail.size, "Размер не найден");
        assert_eq!(detail.seeders, "Нет данных");
    }

    #[test]
    fn missing_info_hash_is_hard_parse_error() {
        let page = detail_page("Матрица", "Фантастика", "2.3 ГБ", "17");
        let err = parse_release_detail(&page, "/details.php?id=4").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn short_hash_does_not_satisfy_the_requirement() {
        let page = format!(
            "{}\nИнфо хеш: 0123456789abcdef",
            detail_page("Матрица", "Фантастика", "2.3 ГБ", "17")
        );
        assert!(parse_release_detail(&page, "/details.php?id=5").is_err());
    }

    #[test]
    fn overlong_hex_run_is_rejected() {
        let page = format!(
            "{}\nИнфо хеш: {HASH}ff",
            detail_page("Матрица", "Фантастика", "2.3 ГБ", "17")
        );
        assert!(parse_release_detail(&page, "/details.php?id=5").is_err());
    }

    #[test]
    fn url_without_release_id_is_hard_parse_error() {
        let page = with_hash(&detail_page("Матрица", "Фантастика", "2.3 ГБ", "17"));
        let err = parse_release_detail(&page, "https://kinozal.tv/details.php").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn hash_present_but_soft_fields_missing_still_succeeds() {
        // The hash requirement is independent of the soft fields.
        let page = format!("<html><body></body></html>\nИнфо хеш: {HASH}");
        let detail = parse_release_detail(&page, "/details.php?id=77").unwrap();
        assert_eq!(detail.info_hash, HASH);
        assert_eq!(detail.title, "Раздача-77");
    }
}
