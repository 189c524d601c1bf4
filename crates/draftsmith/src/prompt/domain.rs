use std::fmt;

/// Application domain guessed from the wording of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainHint {
    Ecommerce,
    Admin,
    Auth,
    Landing,
    Blog,
    General,
}

struct Keywords {
    hint: DomainHint,
    /// Matched as whole ASCII words.
    words: &'static [&'static str],
    /// Matched as substrings.
    phrases: &'static [&'static str],
}

/// Checked in order; the first match wins.
const KEYWORDS: &[Keywords] = &[
    Keywords {
        hint: DomainHint::Ecommerce,
        words: &[
            "ec", "ecommerce", "commerce", "shop", "store", "cart", "checkout", "order",
            "orders", "product", "products",
        ],
        phrases: &["商品", "カート", "注文"],
    },
    Keywords {
        hint: DomainHint::Admin,
        words: &["admin", "dashboard", "management", "backoffice"],
        phrases: &["管理"],
    },
    Keywords {
        hint: DomainHint::Auth,
        words: &["login", "signin", "signup", "auth", "authentication", "password"],
        phrases: &["ログイン", "認証"],
    },
    Keywords {
        hint: DomainHint::Landing,
        words: &["lp", "landing", "homepage"],
        phrases: &["ランディング", "トップページ"],
    },
    Keywords {
        hint: DomainHint::Blog,
        words: &["blog", "article", "articles", "cms", "post", "posts"],
        phrases: &["ブログ", "記事"],
    },
];

impl DomainHint {
    pub fn infer(prompt: &str) -> Self {
        let lowered = prompt.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        KEYWORDS
            .iter()
            .find(|k| {
                k.words.iter().any(|kw| words.contains(kw))
                    || k.phrases.iter().any(|p| lowered.contains(p))
            })
            .map_or(DomainHint::General, |k| k.hint)
    }

    pub fn description(&self) -> &'static str {
        match self {
            DomainHint::Ecommerce => {
                "E-commerce: product listings, cart, checkout and order history"
            }
            DomainHint::Admin => "Administration: user and content management with role-based access",
            DomainHint::Auth => "Authentication: sign-in, sign-up and credential handling",
            DomainHint::Landing => "Landing page: hero section, feature highlights and call to action",
            DomainHint::Blog => "Blog / CMS: articles, categories and an editorial workflow",
            DomainHint::General => "General web application",
        }
    }
}

impl fmt::Display for DomainHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
