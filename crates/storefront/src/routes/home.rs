//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::Nav;

// =============================================================================
// Static content
// =============================================================================

/// A past performer and their slideshow images.
#[derive(Clone, Copy)]
pub struct Performer {
    pub name: &'static str,
    pub images: [&'static str; 3],
}

/// Past performers, in slideshow order.
pub const PERFORMERS: [Performer; 4] = [
    Performer {
        name: "Mohammed Irfan",
        images: [
            "/static/images/artists/irfan_1.jpg",
            "/static/images/artists/irfan_2.jpg",
            "/static/images/artists/irfan_3.jpg",
        ],
    },
    Performer {
        name: "Anubhav Singh Bassi",
        images: [
            "/static/images/artists/bassi_1.jpg",
            "/static/images/artists/bassi_2.webp",
            "/static/images/artists/bassi_3.webp",
        ],
    },
    Performer {
        name: "Gaurav Kapoor",
        images: [
            "/static/images/artists/kapoor_1.png",
            "/static/images/artists/kapoor_2.png",
            "/static/images/artists/kapoor_3.jpg",
        ],
    },
    Performer {
        name: "Aaditya Kulshreshth",
        images: [
            "/static/images/artists/artist4-1.jpg",
            "/static/images/artists/artist4-2.jpg",
            "/static/images/artists/artist4-3.jpg",
        ],
    },
];

/// A highlighted idea under the theme.
#[derive(Clone, Copy)]
pub struct Highlight {
    pub title: &'static str,
    pub description: &'static str,
}

/// This year's festival theme.
pub struct Theme {
    pub title: &'static str,
    pub paragraphs: [&'static str; 3],
    pub highlights: [Highlight; 2],
}

pub const THEME: Theme = Theme {
    title: "Reclaiming the Realms",
    paragraphs: [
        "\"Reclaim\" is a word rooted in Latin \"reclamare\": to call back, to demand the return of what was lost. Here it is not merely about retrieval, but about lost wisdom returning to its rightful owners.",
        "\"Realms\" denote sovereign territories, standing for technology's five domains: energy, memory, connection, creation and logic. They appear as the realms of fire, water, air, earth and aether.",
        "The theme frames technology as elements to be reclaimed and reunited, each realm returned to its rightful owner and stripped from those it does not belong to.",
    ],
    highlights: [
        Highlight {
            title: "Restoration of knowledge",
            description: "Restoring ancient wisdom and applying it to our understanding of technology.",
        },
        Highlight {
            title: "Reuniting of Elements",
            description: "Reclaiming the realms under one person, and seeing technology whole through its elements.",
        },
    ],
};

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub theme: &'static Theme,
    pub performers: &'static [Performer],
    pub nonce: String,
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn home(session: Session, CspNonce(nonce): CspNonce) -> impl IntoResponse {
    HomeTemplate {
        nav: Nav::load(&session).await,
        theme: &THEME,
        performers: &PERFORMERS,
        nonce,
    }
}
