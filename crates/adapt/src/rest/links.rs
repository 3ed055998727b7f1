// crates/adapt/src/rest/links.rs

use crate::core::{build_query, LinkSet, LinkTarget, Params};
use domain::item::{Item, ItemId};
use domain::resource::{Feature, ResourceType, Taxonomy};
use serde_json::json;

pub const REL_FEATURED_MEDIA: &str = "https://api.w.org/featuredmedia";
pub const REL_ATTACHMENT: &str = "https://api.w.org/attachment";
pub const REL_TERM: &str = "https://api.w.org/term";

/// Builds hypermedia relations for one resource type.
pub struct LinkBuilder<'a> {
    /// `{site}/{prefix}/{namespace}`
    pub api_root: &'a str,
    pub ty: &'a ResourceType,
    pub taxonomies: &'a [Taxonomy],
    /// Collection base of the media type, when one is exposed.
    pub media_base: Option<&'a str>,
}

impl LinkBuilder<'_> {
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.api_root, self.ty.rest_base)
    }

    pub fn item_url(&self, id: ItemId) -> String {
        format!("{}/{}/{id}", self.api_root, self.ty.rest_base)
    }

    /// Collection URL carrying `params` with `page` replaced.
    pub fn page_url(&self, params: &Params, page: u64) -> String {
        let mut params = params.clone();
        params.insert("page".into(), json!(page));
        format!("{}?{}", self.collection_url(), build_query(&params))
    }

    pub fn item_links(&self, item: &Item) -> LinkSet {
        let root = self.api_root;
        let ty = self.ty;
        let mut links = LinkSet::default();

        links.add("self", LinkTarget::new(self.item_url(item.id)));
        links.add("collection", LinkTarget::new(self.collection_url()));
        links.add("about", LinkTarget::new(format!("{root}/types/{}", ty.name)));

        if ty.supports(Feature::Author) && item.author != 0 {
            links.add(
                "author",
                LinkTarget::new(format!("{root}/users/{}", item.author)).embeddable(),
            );
        }
        if ty.supports(Feature::Comments) {
            links.add(
                "replies",
                LinkTarget::new(format!("{root}/comments?post={}", item.id)).embeddable(),
            );
        }
        if ty.supports(Feature::Revisions) {
            links.add(
                "version-history",
                LinkTarget::new(format!("{}/revisions", self.item_url(item.id))),
            );
        }
        if ty.hierarchical && item.parent != 0 {
            links.add("up", LinkTarget::new(self.item_url(item.parent)).embeddable());
        }
        if let Some(media) = self.media_base {
            if item.featured_media != 0 {
                links.add(
                    REL_FEATURED_MEDIA,
                    LinkTarget::new(format!("{root}/{media}/{}", item.featured_media)).embeddable(),
                );
            }
            if !ty.attachment_like {
                links.add(
                    REL_ATTACHMENT,
                    LinkTarget::new(format!("{root}/{media}?parent={}", item.id)),
                );
            }
        }
        for tax in self.taxonomies {
            links.add(
                REL_TERM,
                LinkTarget::new(format!("{root}/{}?post={}", tax.rest_base, item.id))
                    .embeddable()
                    .attr("taxonomy", tax.name.as_str()),
            );
        }
        links
    }
}
