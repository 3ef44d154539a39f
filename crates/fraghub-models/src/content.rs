use crate::labelled_enum;

labelled_enum!(
    /// Attachment kind of a post.
    PostMediaType, "post media type" {
        Image => "image",
        Video => "video",
        Demo => "demo",
        None => "none",
    }
);

labelled_enum!(
    ForumCategoryKind, "forum category" {
        Maps => "maps",
        Updates => "updates",
        Matches => "matches",
        Settings => "settings",
        Memes => "memes",
    }
);

labelled_enum!(
    GalleryMediaType, "gallery media type" {
        Screenshot => "screenshot",
        Meme => "meme",
        Clip => "clip",
        Other => "other",
    }
);

labelled_enum!(
    /// Section of the materials library.
    MaterialCategory, "material category" {
        Configs => "configs",
        Guides => "guides",
        Tutorials => "tutorials",
        Training => "training",
        Demos => "demos",
    }
);

labelled_enum!(
    PortfolioItemType, "portfolio item type" {
        Screenshot => "screenshot",
        Demo => "demo",
        Video => "video",
        Highlight => "highlight",
    }
);

labelled_enum!(
    /// In-game role a portfolio item showcases.
    PlayerRole, "player role" {
        Rifler => "rifler",
        Awper => "awper",
        Lurker => "lurker",
        Support => "support",
        Igl => "igl",
        Entry => "entry",
    }
);

labelled_enum!(
    EventType, "event type" {
        Patch => "patch",
        Tournament => "tournament",
        Competition => "competition",
        Other => "other",
    }
);

labelled_enum!(
    AnnouncementType, "announcement type" {
        Tournament => "tournament",
        Server => "server",
        Rules => "rules",
        Update => "update",
    }
);
