//! Server-rendered HTML for the book pages.

use std::fmt::Write;

use crate::service::endpoints::BookPage;

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Gestion des livres</title>
    <style>
        body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ccc; padding: .4rem; text-align: left; }
        .alert { padding: .75rem; margin: 1rem 0; border-radius: 4px; }
        .alert-error { background: #fde2e2; color: #8a1f1f; }
        .alert-success { background: #e2f5e5; color: #1f6b2c; }
        form.inline { display: inline; }
        section { margin: 1.5rem 0; }
    </style>
</head>
<body>
    <h1>Gestion des livres</h1>
"#;

const FORMS: &str = r#"    <section id="add-book">
        <h2>Ajouter un livre</h2>
        <form method="POST" action="/books/add">
            <input type="text" name="titre" placeholder="Titre" required>
            <input type="text" name="auteur" placeholder="Auteur" required>
            <input type="number" name="année" placeholder="Année" required>
            <input type="text" name="genre" placeholder="Genre (optionnel)">
            <button type="submit">Ajouter</button>
        </form>
    </section>
    <section id="add-many">
        <h2>Ajouter plusieurs livres (JSON)</h2>
        <form method="POST" action="/books/add-many">
            <textarea name="books" rows="5" cols="80" placeholder='[{"titre": "...", "auteur": "...", "année": 2001}]'></textarea>
            <button type="submit">Ajouter les livres</button>
        </form>
    </section>
    <section id="delete-by-title">
        <h2>Supprimer par titre</h2>
        <form method="POST" action="/books/delete-by-title">
            <input type="text" name="titre" placeholder="Titre" required>
            <button type="submit">Supprimer</button>
        </form>
    </section>
    <section id="delete-by-author">
        <h2>Supprimer par auteur</h2>
        <form method="POST" action="/books/delete-by-author">
            <input type="text" name="auteur" placeholder="Auteur" required>
            <button type="submit">Supprimer</button>
        </form>
    </section>
"#;

/// Render the book list page with its banner and forms.
pub fn book_page(page: &BookPage) -> String {
    let mut html = String::from(HEAD);

    if let Some(error) = &page.error {
        let _ = writeln!(html, r#"    <div class="alert alert-error">{}</div>"#, escape(error));
    }
    if let Some(success) = &page.success {
        let _ = writeln!(html, r#"    <div class="alert alert-success">{}</div>"#, escape(success));
    }

    html.push_str(FORMS);
    html.push_str("    <section id=\"books\">\n        <h2>Liste des livres</h2>\n");

    if page.books.is_empty() {
        html.push_str("        <p class=\"empty\">Aucun livre pour le moment.</p>\n");
    } else {
        html.push_str(
            "        <table>\n            <tr><th>Titre</th><th>Auteur</th><th>Année</th><th>Genre</th><th>Actions</th></tr>\n",
        );
        for book in &page.books {
            let id = book.id.to_string();
            let genre = book.genre.as_deref().map(escape).unwrap_or_default();
            let _ = write!(
                html,
                r#"            <tr data-id="{id}">
                <td>{title}</td><td>{author}</td><td>{year}</td><td>{genre}</td>
                <td>
                    <form class="inline" method="POST" action="/books/update/{id}">
                        <input type="text" name="titre" value="{title}" required>
                        <input type="text" name="auteur" value="{author}" required>
                        <input type="number" name="année" value="{year}" required>
                        <input type="text" name="genre" value="{genre}">
                        <button type="submit">Modifier</button>
                    </form>
                    <form class="inline" method="POST" action="/books/delete/{id}">
                        <button type="submit">Supprimer</button>
                    </form>
                </td>
            </tr>
"#,
                title = escape(&book.title),
                author = escape(&book.author),
                year = book.year.map(|y| y.to_string()).unwrap_or_default(),
            );
        }
        html.push_str("        </table>\n");
    }

    html.push_str("    </section>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::Book;
    use docstore::DocumentId;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_page_shows_banner_and_books() {
        let page = BookPage {
            books: vec![Book {
                id: DocumentId::new(),
                title: "Harry Potter à l'école des sorciers".to_string(),
                author: "J. K. Rowling".to_string(),
                year: Some(2001),
                genre: Some("Fantasy".to_string()),
            }],
            error: None,
            success: Some("Livre ajouté avec succès!".to_string()),
        };
        let html = book_page(&page);
        assert!(html.contains(r#"<div class="alert alert-success">"#));
        assert!(html.contains("Livre ajouté avec succès!"));
        assert!(html.contains("Harry Potter à l&#39;école des sorciers"));
        assert!(html.contains("<td>2001</td>"));
        assert!(!html.contains(r#"<div class="alert alert-error">"#));
    }

    #[test]
    fn test_empty_page() {
        let page = BookPage {
            books: Vec::new(),
            error: Some("<script>".to_string()),
            success: None,
        };
        let html = book_page(&page);
        assert!(html.contains("Aucun livre pour le moment."));
        assert!(html.contains("&lt;script&gt;"));
    }
}
