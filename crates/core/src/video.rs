use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub page: u32,
    /// Empty means the video is announced but not published yet.
    #[serde(default)]
    pub src: String,
    pub title: String,
    #[serde(default)]
    pub replace_content: bool,
}

impl VideoDescriptor {
    pub fn is_placeholder(&self) -> bool {
        self.src.trim().is_empty()
    }

    pub fn badge(&self) -> &'static str {
        if self.replace_content { "VIDEO" } else { "EXTRA" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("video entry #{index} has page 0; pages start at 1")]
    ZeroPage { index: usize },
    #[error("video entry #{index} for page {page} has an empty title")]
    EmptyTitle { index: usize, page: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub videos: Vec<VideoDescriptor>,
}

impl VideoConfig {
    pub fn new(videos: Vec<VideoDescriptor>) -> Self {
        Self { videos }
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn lookup(&self, page: u32) -> Option<&VideoDescriptor> {
        self.videos.iter().find(|video| video.page == page)
    }

    /// Rejects malformed entries; drops pages past the end of the document
    /// and repeated pages, keeping the first entry for each page.
    pub fn validated(self, total_pages: u32) -> Result<Self, ConfigError> {
        let mut videos: Vec<VideoDescriptor> = Vec::with_capacity(self.videos.len());
        for (index, mut video) in self.videos.into_iter().enumerate() {
            if video.page == 0 {
                return Err(ConfigError::ZeroPage { index });
            }
            video.title = video.title.trim().to_string();
            if video.title.is_empty() {
                return Err(ConfigError::EmptyTitle {
                    index,
                    page: video.page,
                });
            }
            video.src = video.src.trim().to_string();

            if video.page > total_pages {
                log::warn!(
                    "ignoring video for page {} (document has {} pages)",
                    video.page,
                    total_pages
                );
                continue;
            }
            if videos.iter().any(|existing| existing.page == video.page) {
                log::warn!("ignoring duplicate video for page {}", video.page);
                continue;
            }
            videos.push(video);
        }
        Ok(Self { videos })
    }
}
