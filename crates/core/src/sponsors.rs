//! The festival's sponsor list.
//!
//! Order matters: it is the order cards appear on the sponsor wall.

use serde::Serialize;

/// Directory sponsor logos are served from.
pub const LOGO_DIR: &str = "/spons_logos";

/// One sponsor card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SponsorEntry {
    pub name: &'static str,
    /// File name under [`LOGO_DIR`].
    pub logo: &'static str,
    pub website_url: &'static str,
    /// Dark or transparent logos that need a white plate behind them.
    pub needs_light_plate: bool,
}

impl SponsorEntry {
    const fn new(
        name: &'static str,
        logo: &'static str,
        website_url: &'static str,
        needs_light_plate: bool,
    ) -> Self {
        Self {
            name,
            logo,
            website_url,
            needs_light_plate,
        }
    }

    /// Public path of the logo image.
    #[must_use]
    pub fn logo_path(&self) -> String {
        format!("{LOGO_DIR}/{}", urlencode_spaces(self.logo))
    }

    /// Whether the card links anywhere.
    #[must_use]
    pub fn has_website(&self) -> bool {
        self.website_url != "#"
    }
}

fn urlencode_spaces(file: &str) -> String {
    file.replace(' ', "%20")
}

/// All sponsors, in display order.
pub static SPONSORS: [SponsorEntry; 47] = [
    SponsorEntry::new("Amalfi", "1amalfi.jpg", "https://amalfiindia.com/", false),
    SponsorEntry::new("Beardo", "2beardo.png", "https://www.beardo.in/", false),
    SponsorEntry::new("Bihar Tourism", "3bihartourism.png", "https://tourism.bihar.gov.in/", false),
    SponsorEntry::new("Bingo", "4bingo.png", "https://www.itcportal.com/brands-microsite/bingo.aspx", false),
    SponsorEntry::new("BRPNNL", "5brpnnl.png", "https://bihar.nic.in/", true),
    SponsorEntry::new("BSACS", "6bsacs.png", "https://x.com/bsacsofficial?lang=en", true),
    SponsorEntry::new("Coding Ninjas", "7coding ninjas.png", "https://www.codingninjas.com/", true),
    SponsorEntry::new("Coca-Cola", "8coke.png", "https://www.coca-cola.com/in/en", false),
    SponsorEntry::new("Google Community Events", "9communityevents.png", "https://crowdsource.google.com/", false),
    SponsorEntry::new("DU Beat", "10dubeat.png", "https://dubeat.com/", false),
    SponsorEntry::new("Eduquis", "11eduquis.png", "https://eduquis.in/", false),
    SponsorEntry::new("EngConvo", "12engconvo.png", "https://engconvo.com/", false),
    SponsorEntry::new("Eventom", "13eventom.png", "https://www.eventom.co.in/", false),
    SponsorEntry::new("GrabOn", "14grabon.png", "https://www.grabon.in/", false),
    SponsorEntry::new("HackerEarth", "15hackerearth.png", "https://www.hackerearth.com/", false),
    SponsorEntry::new("Hero", "16hero.png", "https://www.heromotocorp.com/", false),
    SponsorEntry::new("The Himalayan Yeti", "17himalayan yeti.png", "https://www.thehimalayanyeti.co.in/", false),
    SponsorEntry::new("Hindustan Petroleum", "18hp.png", "https://www.hindustanpetroleum.com/", false),
    SponsorEntry::new("ICETL", "19icetl.png", "#", false),
    SponsorEntry::new("JetBrains", "20jetbrains.png", "https://www.jetbrains.com/", true),
    SponsorEntry::new("JK Tyre", "21jktyre.png", "https://www.jktyre.com/", false),
    SponsorEntry::new("Knowafest", "22knowafest.png", "https://www.knowafest.com/", false),
    SponsorEntry::new("LIC", "23lic.png", "https://licindia.in/", false),
    SponsorEntry::new("LS Master", "24lsmaster.jpg", "https://in.linkedin.com/parvagarwal", false),
    SponsorEntry::new("NHAI", "25nhai.jpg", "https://nhai.gov.in/", false),
    SponsorEntry::new("NTPC", "26ntpc.png", "https://www.ntpc.co.in/", true),
    SponsorEntry::new("NVIDIA", "27nvidia.png", "https://www.nvidia.com/", true),
    SponsorEntry::new("Patna Beats", "28patnabeats.png", "https://in.linkedin.com/company/patnabeats", false),
    SponsorEntry::new("Patriles", "29patriles.png", "#", false),
    SponsorEntry::new("Pizza Hut", "30pizahut.png", "https://www.pizzahut.co.in/", true),
    SponsorEntry::new("Razorpay", "31razorpay.png", "https://razorpay.com/", false),
    SponsorEntry::new("Red Bull", "32redbull.jpg", "https://www.redbull.com/", false),
    SponsorEntry::new("Red FM", "33redfm.png", "https://www.redfmindia.in/", false),
    SponsorEntry::new("SBI", "34sbi.png", "https://www.onlinesbi.sbi/", false),
    SponsorEntry::new("The Souled Store", "35souledstore.png", "https://www.thesouledstore.com/", true),
    SponsorEntry::new("STPI", "36stpi.jpg", "https://stpi.in/", false),
    SponsorEntry::new("Startup Bihar", "37strtupbihar.jpg", "https://startup.bihar.gov.in/", false),
    SponsorEntry::new("Swiggy", "38swiggy.png", "https://www.swiggy.com/", false),
    SponsorEntry::new("Sibylline", "39sybbline.png", "https://sibylline.co.uk/", false),
    SponsorEntry::new("TechByte", "40techbyte.png", "https://techbyte.co.in/", false),
    SponsorEntry::new("TechProLabz", "41techschool.png", "https://techprolabz.com/", false),
    SponsorEntry::new("Townscript", "42townscript.png", "https://www.townscript.com/", false),
    SponsorEntry::new("Udyog Vibhag Bihar", "43udyogvibhag.jpg", "https://udyami.bihar.gov.in/", false),
    SponsorEntry::new("UltraTech", "44ultratech.png", "https://www.ultratechcement.com/", false),
    SponsorEntry::new("Unstop", "45unstop.jpg", "https://unstop.com/", false),
    SponsorEntry::new("Youth Incorporated", "46youtuh incorporated.png", "https://youthincmag.com/", false),
    SponsorEntry::new("Zebronics", "47zebronics.png", "https://zebronics.com/", false),
];
